use std::time::Duration;

use crate::TradingMode;

/// All configuration loaded from environment variables at startup.
/// Every external service is optional; a missing credential disables the
/// corresponding feature instead of failing startup.
#[derive(Debug, Clone)]
pub struct Config {
    // Exchange credentials (public endpoints work without them)
    pub binance_api_key: Option<String>,
    pub binance_secret: Option<String>,

    // Messaging providers
    pub telegram_token: Option<String>,
    pub twilio: Option<TwilioConfig>,

    // HTTP server
    pub port: u16,

    // Operating mode
    pub trading_mode: TradingMode,

    // Database
    pub database_url: Option<String>,
    pub db_max_connections: u32,

    // Scanner config file path
    pub watchlist_path: String,

    /// Applied independently to exchange calls, pool acquisition and each
    /// channel dispatch.
    pub upstream_timeout: Duration,
}

/// Credentials for the Twilio WhatsApp API.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number, e.g. `+14155238886`.
    pub whatsapp_from: String,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Panics on malformed values.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let trading_mode = match optional_env("MODE")
            .unwrap_or_else(|| "paper".to_string())
            .to_lowercase()
            .as_str()
        {
            "paper" => TradingMode::Paper,
            "live" => TradingMode::Live,
            other => panic!("ERROR: MODE must be 'paper' or 'live', got: '{other}'"),
        };

        let twilio = match (
            optional_env("TWILIO_ACCOUNT_SID"),
            optional_env("TWILIO_AUTH_TOKEN"),
            optional_env("TWILIO_WHATSAPP_FROM"),
        ) {
            (Some(account_sid), Some(auth_token), Some(whatsapp_from)) => Some(TwilioConfig {
                account_sid,
                auth_token,
                whatsapp_from,
            }),
            _ => None,
        };

        Config {
            binance_api_key: optional_env("BINANCE_API_KEY"),
            binance_secret: optional_env("BINANCE_API_SECRET"),
            telegram_token: optional_env("TELEGRAM_TOKEN"),
            twilio,
            port: parsed_env("PORT", 8000),
            trading_mode,
            database_url: optional_env("DATABASE_URL"),
            db_max_connections: parsed_env::<u32>("DB_MAX_CONNECTIONS", 5).max(1),
            watchlist_path: optional_env("WATCHLIST_PATH")
                .unwrap_or_else(|| "config/watchlist.toml".to_string()),
            upstream_timeout: Duration::from_secs(parsed_env("UPSTREAM_TIMEOUT_SECS", 10)),
        }
    }
}

/// Returns the variable's value, treating empty strings as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match optional_env(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            panic!("Environment variable '{key}' has an invalid value: '{raw}'")
        }),
        None => default,
    }
}
