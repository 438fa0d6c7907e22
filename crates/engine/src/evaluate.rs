use tracing::debug;

use common::{Evaluation, MarketData, MarketSet, Result};
use strategy::{EmaCrossover, WatchlistConfig};

use crate::symbols::resolve;

/// How a single symbol is evaluated: which candles to fetch and which
/// crossover to run over them.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationParams {
    pub timeframe: String,
    pub candle_limit: usize,
    pub crossover: EmaCrossover,
}

impl Default for EvaluationParams {
    fn default() -> Self {
        Self::from_config(&WatchlistConfig::default())
    }
}

impl EvaluationParams {
    pub fn from_config(cfg: &WatchlistConfig) -> Self {
        Self {
            timeframe: cfg.timeframe.clone(),
            candle_limit: cfg.candle_limit,
            crossover: cfg.crossover(),
        }
    }
}

/// Resolve `requested` against `markets`, fetch its recent candles and
/// classify the latest bar.
pub async fn evaluate_symbol(
    exchange: &dyn MarketData,
    markets: &MarketSet,
    requested: &str,
    params: &EvaluationParams,
) -> Result<Evaluation> {
    let symbol = resolve(requested, markets)?;
    let candles = exchange
        .fetch_recent_candles(&symbol, &params.timeframe, params.candle_limit)
        .await?;
    let reading = params.crossover.evaluate(&candles)?;

    debug!(
        symbol = %symbol,
        signal = %reading.signal,
        short_ema = reading.short_ema,
        long_ema = reading.long_ema,
        "Evaluated symbol"
    );

    Ok(Evaluation {
        symbol,
        signal: reading.signal,
        price: reading.last_close,
        short_ema: reading.short_ema,
        long_ema: reading.long_ema,
    })
}
