mod health;
mod market;
mod settings;

pub use health::health_router;
pub use market::market_router;
pub use settings::settings_router;
