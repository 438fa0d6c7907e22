use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

use common::{Error, NotificationPrefs, Result, UserSettings};

/// Persistence for per-user notification preferences.
///
/// The pool is optional: when no database is configured every read returns
/// nothing and every write is a no-op, so callers never fail on a missing
/// store. Cloning is cheap and shares the same pool.
#[derive(Clone, Default)]
pub struct UserStore {
    pool: Option<SqlitePool>,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool: Some(pool) }
    }

    /// A store with no backing database.
    pub fn unavailable() -> Self {
        Self { pool: None }
    }

    /// Open a bounded pool against `url` and apply pending migrations.
    ///
    /// Acquisition waits for a free connection for at most `acquire_timeout`.
    pub async fn connect(url: &str, max_connections: u32, acquire_timeout: Duration) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(max_connections.max(1))
            .acquire_timeout(acquire_timeout)
            .connect_with(options)
            .await?;

        let store = Self::new(pool);
        store.migrate().await?;
        info!(max_connections, "User preference store ready");
        Ok(store)
    }

    pub fn is_configured(&self) -> bool {
        self.pool.is_some()
    }

    pub async fn migrate(&self) -> Result<()> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };
        sqlx::migrate!("../../migrations")
            .run(pool)
            .await
            .map_err(|e| Error::Database(e.into()))
    }

    /// Settings for `user_id`, or `None` if the user never saved any or the
    /// store is unavailable.
    pub async fn get(&self, user_id: i64) -> Result<Option<UserSettings>> {
        let Some(pool) = &self.pool else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, UserSettings>(
            r#"
            SELECT user_id, notify_whatsapp, notify_telegram, phone_number, telegram_chat_id
            FROM user_settings
            WHERE user_id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    /// Create or fully replace the settings row for `user_id`.
    pub async fn upsert(&self, user_id: i64, prefs: &NotificationPrefs) -> Result<()> {
        let Some(pool) = &self.pool else {
            debug!(user_id, "Store unavailable, settings update dropped");
            return Ok(());
        };

        sqlx::query(
            r#"
            INSERT INTO user_settings (user_id, notify_whatsapp, notify_telegram, phone_number, telegram_chat_id)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id) DO UPDATE SET
                notify_whatsapp  = excluded.notify_whatsapp,
                notify_telegram  = excluded.notify_telegram,
                phone_number     = excluded.phone_number,
                telegram_chat_id = excluded.telegram_chat_id
            "#,
        )
        .bind(user_id)
        .bind(prefs.notify_whatsapp)
        .bind(prefs.notify_telegram)
        .bind(prefs.phone_number.as_deref())
        .bind(prefs.telegram_chat_id.as_deref())
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Identifiers of every user with stored settings, ascending.
    pub async fn list_user_ids(&self) -> Result<Vec<i64>> {
        let Some(pool) = &self.pool else {
            return Ok(Vec::new());
        };

        let ids = sqlx::query_scalar::<_, i64>("SELECT user_id FROM user_settings ORDER BY user_id")
            .fetch_all(pool)
            .await?;
        Ok(ids)
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
