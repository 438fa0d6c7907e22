use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical `BASE/QUOTE` symbols known to the exchange.
pub type MarketSet = BTreeSet<String>;

/// One OHLCV bar as reported by the exchange. Fetched per evaluation and
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Open time of the bar.
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// A bar whose only meaningful field is the close. Handy for indicator input.
    pub fn from_close(timestamp: DateTime<Utc>, close: f64) -> Self {
        Self {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        }
    }
}

/// Classification of the latest bar of a two-EMA crossover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    /// BUY and SELL warrant a notification; HOLD does not.
    pub fn is_actionable(&self) -> bool {
        !matches!(self, Signal::Hold)
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
            Signal::Hold => write!(f, "HOLD"),
        }
    }
}

/// Result of evaluating one symbol. Transient, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Resolved exchange symbol.
    pub symbol: String,
    pub signal: Signal,
    /// Close of the most recent candle.
    pub price: f64,
    pub short_ema: f64,
    pub long_ema: f64,
}

impl Evaluation {
    /// Human-readable alert text sent to users on an actionable signal.
    pub fn alert_text(&self) -> String {
        let icon = match self.signal {
            Signal::Buy => "📈",
            Signal::Sell => "📉",
            Signal::Hold => "⏸",
        };
        format!(
            "{icon} {} signal on {} at {}",
            self.signal, self.symbol, self.price
        )
    }
}

/// Per-user notification preferences as stored in `user_settings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSettings {
    pub user_id: i64,
    pub notify_whatsapp: bool,
    pub notify_telegram: bool,
    pub phone_number: Option<String>,
    pub telegram_chat_id: Option<String>,
}

impl UserSettings {
    pub fn new(user_id: i64, prefs: NotificationPrefs) -> Self {
        Self {
            user_id,
            notify_whatsapp: prefs.notify_whatsapp,
            notify_telegram: prefs.notify_telegram,
            phone_number: prefs.phone_number,
            telegram_chat_id: prefs.telegram_chat_id,
        }
    }

    /// Phone number to message over WhatsApp, if that channel is enabled and
    /// an address is configured.
    pub fn whatsapp_destination(&self) -> Option<&str> {
        enabled_address(self.notify_whatsapp, self.phone_number.as_deref())
    }

    /// Telegram chat id or `@channel` name, if that channel is enabled and an
    /// address is configured.
    pub fn telegram_destination(&self) -> Option<&str> {
        enabled_address(self.notify_telegram, self.telegram_chat_id.as_deref())
    }
}

fn enabled_address(enabled: bool, address: Option<&str>) -> Option<&str> {
    if !enabled {
        return None;
    }
    address.map(str::trim).filter(|a| !a.is_empty())
}

/// Body of a settings update. Every field is replaced on upsert; omitted
/// fields reset to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPrefs {
    #[serde(default)]
    pub notify_whatsapp: bool,
    #[serde(default)]
    pub notify_telegram: bool,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub telegram_chat_id: Option<String>,
}

/// Operating mode flag. Reported by the health endpoint; no order flow
/// depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    Live,
    Paper,
}

impl std::fmt::Display for TradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradingMode::Live => write!(f, "live"),
            TradingMode::Paper => write!(f, "paper"),
        }
    }
}

/// Current state of the watchlist scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScannerState {
    #[default]
    Idle,
    Scanning,
    Stopped,
}

impl std::fmt::Display for ScannerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScannerState::Idle => write!(f, "idle"),
            ScannerState::Scanning => write!(f, "scanning"),
            ScannerState::Stopped => write!(f, "stopped"),
        }
    }
}
