use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use common::UserSettings;
use store::UserStore;

use crate::MessageChannel;

/// Outcome of delivering one message to one user or to everyone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Messages accepted by a provider.
    pub delivered: usize,
    /// Provider errors and timeouts.
    pub failed: usize,
    /// Channels enabled by the user but with no provider configured.
    pub skipped: usize,
}

impl DispatchReport {
    fn merge(&mut self, other: DispatchReport) {
        self.delivered += other.delivered;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

/// Delivers alert text to users over their enabled channels.
///
/// Never returns an error: every failure is logged and counted so that one
/// broken provider or user cannot interrupt delivery to the rest.
#[derive(Clone)]
pub struct Notifier {
    store: UserStore,
    whatsapp: Option<Arc<dyn MessageChannel>>,
    telegram: Option<Arc<dyn MessageChannel>>,
    dispatch_timeout: Duration,
}

impl Notifier {
    pub fn new(store: UserStore, dispatch_timeout: Duration) -> Self {
        Self {
            store,
            whatsapp: None,
            telegram: None,
            dispatch_timeout,
        }
    }

    pub fn with_whatsapp(mut self, channel: Arc<dyn MessageChannel>) -> Self {
        self.whatsapp = Some(channel);
        self
    }

    pub fn with_telegram(mut self, channel: Arc<dyn MessageChannel>) -> Self {
        self.telegram = Some(channel);
        self
    }

    /// Send `message` to one user. Missing settings are a logged no-op.
    pub async fn notify(&self, user_id: i64, message: &str) -> DispatchReport {
        let settings = match self.store.get(user_id).await {
            Ok(Some(s)) => s,
            Ok(None) => {
                info!(user_id, "No notification settings for user, skipping");
                return DispatchReport::default();
            }
            Err(e) => {
                error!(user_id, error = %e, "Failed to load user settings");
                return DispatchReport::default();
            }
        };

        self.dispatch(&settings, message).await
    }

    /// Send `message` to every user with stored settings.
    pub async fn broadcast(&self, message: &str) -> DispatchReport {
        let user_ids = match self.store.list_user_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, "Failed to list users for broadcast");
                return DispatchReport::default();
            }
        };

        let mut report = DispatchReport::default();
        for user_id in user_ids {
            report.merge(self.notify(user_id, message).await);
        }
        report
    }

    async fn dispatch(&self, settings: &UserSettings, message: &str) -> DispatchReport {
        let mut report = DispatchReport::default();
        let targets = [
            (self.whatsapp.as_ref(), settings.whatsapp_destination(), "whatsapp"),
            (self.telegram.as_ref(), settings.telegram_destination(), "telegram"),
        ];

        for (channel, destination, label) in targets {
            let Some(destination) = destination else {
                continue;
            };
            let Some(channel) = channel else {
                warn!(user_id = settings.user_id, channel = label, "Channel enabled but not configured");
                report.skipped += 1;
                continue;
            };

            match tokio::time::timeout(self.dispatch_timeout, channel.send(destination, message)).await {
                Ok(Ok(())) => {
                    info!(user_id = settings.user_id, channel = channel.name(), "Alert delivered");
                    report.delivered += 1;
                }
                Ok(Err(e)) => {
                    warn!(user_id = settings.user_id, channel = channel.name(), error = %e, "Alert delivery failed");
                    report.failed += 1;
                }
                Err(_) => {
                    warn!(
                        user_id = settings.user_id,
                        channel = channel.name(),
                        timeout = ?self.dispatch_timeout,
                        "Alert delivery timed out"
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }
}
