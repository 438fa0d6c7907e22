use common::{Candle, Error, Result, Signal};

use crate::indicators::ema;

/// Two-EMA crossover evaluated on the latest bar only.
///
/// `short > long` is BUY, `short < long` is SELL, equality is HOLD. There is
/// no hysteresis, so the signal may flip on consecutive bars near a cross.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmaCrossover {
    pub short_span: usize,
    pub long_span: usize,
}

/// Output of one crossover evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossoverReading {
    pub signal: Signal,
    pub last_close: f64,
    pub short_ema: f64,
    pub long_ema: f64,
}

impl Default for EmaCrossover {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SHORT_SPAN, Self::DEFAULT_LONG_SPAN)
    }
}

impl EmaCrossover {
    pub const DEFAULT_SHORT_SPAN: usize = 9;
    pub const DEFAULT_LONG_SPAN: usize = 21;

    pub fn new(short_span: usize, long_span: usize) -> Self {
        assert!(short_span >= 1, "EMA short span must be >= 1");
        assert!(
            short_span < long_span,
            "EMA short span must be less than long span"
        );
        Self {
            short_span,
            long_span,
        }
    }

    /// Classify the most recent candle in `candles` (oldest first).
    ///
    /// Fails with `InsufficientData` on an empty series and with `Other` if
    /// any close is not a finite number.
    pub fn evaluate(&self, candles: &[Candle]) -> Result<CrossoverReading> {
        let last = candles.last().ok_or(Error::InsufficientData)?;

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        if let Some(bad) = closes.iter().find(|c| !c.is_finite()) {
            return Err(Error::Other(format!("malformed candle close: {bad}")));
        }

        let short_ema = ema(&closes, self.short_span).ok_or(Error::InsufficientData)?;
        let long_ema = ema(&closes, self.long_span).ok_or(Error::InsufficientData)?;

        let signal = if short_ema > long_ema {
            Signal::Buy
        } else if short_ema < long_ema {
            Signal::Sell
        } else {
            Signal::Hold
        };

        Ok(CrossoverReading {
            signal,
            last_close: last.close,
            short_ema,
            long_ema,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn candles(closes: &[f64]) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::from_close(start + Duration::minutes(i as i64), c))
            .collect()
    }

    #[test]
    fn empty_series_is_insufficient_data() {
        let err = EmaCrossover::default().evaluate(&[]).unwrap_err();
        assert!(matches!(err, Error::InsufficientData));
    }

    #[test]
    fn constant_series_holds() {
        let reading = EmaCrossover::default().evaluate(&candles(&[1.0; 100])).unwrap();
        assert_eq!(reading.signal, Signal::Hold);
        assert_eq!(reading.last_close, 1.0);
    }

    #[test]
    fn single_candle_holds() {
        let reading = EmaCrossover::default().evaluate(&candles(&[250.0])).unwrap();
        assert_eq!(reading.signal, Signal::Hold);
        assert_eq!(reading.short_ema, reading.long_ema);
    }

    #[test]
    fn rising_series_buys() {
        let prices: Vec<f64> = (0..100).map(|i| 100.0 + i as f64 * 0.5).collect();
        let reading = EmaCrossover::default().evaluate(&candles(&prices)).unwrap();
        assert_eq!(reading.signal, Signal::Buy);
        assert!(reading.short_ema > reading.long_ema);
        assert_eq!(reading.last_close, 149.5);
    }

    #[test]
    fn falling_series_sells() {
        let prices: Vec<f64> = (0..100).map(|i| 200.0 - i as f64 * 0.5).collect();
        let reading = EmaCrossover::default().evaluate(&candles(&prices)).unwrap();
        assert_eq!(reading.signal, Signal::Sell);
    }

    #[test]
    fn latest_bar_decides_after_reversal() {
        // Long decline followed by a sharp rally: the short EMA catches up first
        let mut prices: Vec<f64> = (0..60).map(|i| 200.0 - i as f64).collect();
        prices.extend((0..15).map(|i| 141.0 + i as f64 * 10.0));
        let reading = EmaCrossover::default().evaluate(&candles(&prices)).unwrap();
        assert_eq!(reading.signal, Signal::Buy);
    }

    #[test]
    fn non_finite_close_is_rejected() {
        let err = EmaCrossover::default()
            .evaluate(&candles(&[1.0, f64::NAN, 2.0]))
            .unwrap_err();
        assert!(matches!(err, Error::Other(_)));
    }

    #[test]
    #[should_panic(expected = "less than long span")]
    fn rejects_inverted_spans() {
        EmaCrossover::new(21, 9);
    }
}
