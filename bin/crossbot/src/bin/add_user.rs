//! Register or update one user's notification preferences from the environment.
//!
//! ```text
//! DATABASE_URL=sqlite://crossbot.db USER_ID=1 PHONE_NUMBER=+15550100 \
//!     TELEGRAM_CHAT_ID=@my_channel cargo run --bin add-user
//! ```

use std::time::Duration;

use anyhow::{bail, Context, Result};

use common::NotificationPrefs;
use store::UserStore;

fn env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Toggles default to on whenever the matching address is given.
fn toggle(key: &str, default: bool) -> Result<bool> {
    match env(key) {
        None => Ok(default),
        Some(v) => match v.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => bail!("{key} must be a boolean, got '{other}'"),
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let Some(url) = env("DATABASE_URL") else {
        bail!("DATABASE_URL is not set");
    };
    let user_id: i64 = env("USER_ID")
        .unwrap_or_else(|| "1".to_string())
        .parse()
        .context("USER_ID must be an integer")?;

    let phone_number = env("PHONE_NUMBER");
    let telegram_chat_id = env("TELEGRAM_CHAT_ID");
    let prefs = NotificationPrefs {
        notify_whatsapp: toggle("NOTIFY_WHATSAPP", phone_number.is_some())?,
        notify_telegram: toggle("NOTIFY_TELEGRAM", telegram_chat_id.is_some())?,
        phone_number,
        telegram_chat_id,
    };

    let store = UserStore::connect(&url, 1, Duration::from_secs(10))
        .await
        .context("failed to open user store")?;
    store
        .upsert(user_id, &prefs)
        .await
        .with_context(|| format!("failed to save settings for user {user_id}"))?;
    store.close().await;

    println!("User {user_id} added/updated successfully");
    Ok(())
}
