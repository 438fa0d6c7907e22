use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use common::{Error, Result};

use crate::EmaCrossover;

/// Scanner configuration file (TOML).
///
/// Example `config/watchlist.toml`:
/// ```toml
/// interval_secs = 60
/// timeframe = "1m"
/// candle_limit = 100
/// short_span = 9
/// long_span = 21
/// symbols = ["BTC/USDT", "ETH-USDT", "SOL/USDT"]
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchlistConfig {
    /// Seconds between scanner passes.
    pub interval_secs: u64,
    /// Candle interval requested from the exchange, e.g. "1m".
    pub timeframe: String,
    /// Number of most recent candles fetched per evaluation.
    pub candle_limit: usize,
    pub short_span: usize,
    pub long_span: usize,
    /// Symbols scanned on every pass. Separators are normalized at scan time.
    pub symbols: Vec<String>,
}

impl Default for WatchlistConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            timeframe: "1m".to_string(),
            candle_limit: 100,
            short_span: EmaCrossover::DEFAULT_SHORT_SPAN,
            long_span: EmaCrossover::DEFAULT_LONG_SPAN,
            symbols: vec!["BTC/USDT".to_string(), "ETH/USDT".to_string()],
        }
    }
}

impl WatchlistConfig {
    /// Load from a TOML file. A missing file falls back to the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "Watchlist config not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read '{}': {e}", path.display()))
        })?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("'{}': {e}", path.display())))
    }

    /// Parse and validate TOML content.
    pub fn parse(content: &str) -> Result<Self> {
        let cfg: Self =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(Error::Config("interval_secs must be positive".into()));
        }
        if self.candle_limit == 0 {
            return Err(Error::Config("candle_limit must be positive".into()));
        }
        if self.short_span == 0 || self.short_span >= self.long_span {
            return Err(Error::Config(format!(
                "spans must satisfy 1 <= short_span < long_span, got {} and {}",
                self.short_span, self.long_span
            )));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn crossover(&self) -> EmaCrossover {
        EmaCrossover::new(self.short_span, self.long_span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_file() {
        let cfg = WatchlistConfig::parse(
            r#"
            interval_secs = 30
            timeframe = "5m"
            candle_limit = 200
            short_span = 5
            long_span = 20
            symbols = ["BTC-USDT", "XBT/ZUSD"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.interval(), Duration::from_secs(30));
        assert_eq!(cfg.timeframe, "5m");
        assert_eq!(cfg.crossover(), EmaCrossover::new(5, 20));
        assert_eq!(cfg.symbols, vec!["BTC-USDT", "XBT/ZUSD"]);
    }

    #[test]
    fn omitted_keys_take_defaults() {
        let cfg = WatchlistConfig::parse(r#"symbols = ["SOL/USDT"]"#).unwrap();
        assert_eq!(cfg.interval_secs, 60);
        assert_eq!(cfg.candle_limit, 100);
        assert_eq!(cfg.crossover(), EmaCrossover::default());
    }

    #[test]
    fn inverted_spans_are_rejected() {
        let err = WatchlistConfig::parse("short_span = 30\nlong_span = 10").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(WatchlistConfig::parse("interval_secs = 0").is_err());
    }

    #[test]
    fn missing_file_uses_defaults() {
        let cfg = WatchlistConfig::load("/nonexistent/watchlist.toml").unwrap();
        assert_eq!(cfg, WatchlistConfig::default());
    }
}
