use async_trait::async_trait;

use common::Result;

/// A single outbound messaging provider.
///
/// Implementations deliver one text message to one destination address and
/// report provider failures as `Error::Messaging` or `Error::Http`.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Short provider name used in logs ("whatsapp", "telegram").
    fn name(&self) -> &'static str;

    async fn send(&self, destination: &str, text: &str) -> Result<()>;
}
