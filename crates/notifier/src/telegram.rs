use async_trait::async_trait;
use teloxide::{prelude::*, types::Recipient};
use tracing::debug;

use common::{Error, Result};

use crate::MessageChannel;

/// Telegram Bot API channel.
pub struct TelegramChannel {
    bot: Bot,
}

impl TelegramChannel {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            bot: Bot::new(token),
        }
    }
}

/// Numeric destinations are chat ids; anything else is a public `@channel`.
fn recipient(destination: &str) -> Recipient {
    match destination.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) if destination.starts_with('@') => {
            Recipient::ChannelUsername(destination.to_string())
        }
        Err(_) => Recipient::ChannelUsername(format!("@{destination}")),
    }
}

#[async_trait]
impl MessageChannel for TelegramChannel {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, destination: &str, text: &str) -> Result<()> {
        debug!(destination, "Sending Telegram message");
        self.bot
            .send_message(recipient(destination), text)
            .await
            .map_err(|e| Error::Messaging(format!("telegram: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_destination_is_chat_id() {
        assert_eq!(recipient("-1001234"), Recipient::Id(ChatId(-1001234)));
    }

    #[test]
    fn username_gets_at_prefix() {
        assert_eq!(
            recipient("price_alerts"),
            Recipient::ChannelUsername("@price_alerts".into())
        );
        assert_eq!(
            recipient("@price_alerts"),
            Recipient::ChannelUsername("@price_alerts".into())
        );
    }
}
