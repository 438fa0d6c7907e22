pub mod channel;
pub mod fanout;
pub mod telegram;
pub mod whatsapp;

pub use channel::MessageChannel;
pub use fanout::{DispatchReport, Notifier};
pub use telegram::TelegramChannel;
pub use whatsapp::WhatsAppChannel;
