use async_trait::async_trait;

use crate::{Candle, MarketSet, Result};

/// Read-only market data access.
///
/// `BinanceClient` in `crates/engine` implements this against the public REST
/// API. Symbols are always canonical `BASE/QUOTE` strings; mapping to the
/// exchange's own identifiers is the implementation's concern.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// All symbols currently tradable on the exchange.
    async fn load_markets(&self) -> Result<MarketSet>;

    /// The most recent `limit` candles for `symbol`, oldest first.
    async fn fetch_recent_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>>;

    /// Last traded price for `symbol`.
    async fn current_price(&self, symbol: &str) -> Result<f64>;
}
