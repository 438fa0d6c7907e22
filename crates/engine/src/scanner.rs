use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use common::{MarketData, ScannerState};
use notifier::Notifier;
use strategy::WatchlistConfig;

use crate::evaluate::{evaluate_symbol, EvaluationParams};
use crate::symbols::normalize;

/// Cloneable handle used to observe and stop a running scanner.
#[derive(Clone)]
pub struct ScannerHandle {
    shutdown_tx: Arc<watch::Sender<bool>>,
    state: Arc<RwLock<ScannerState>>,
}

impl ScannerHandle {
    /// Ask the scanner to exit. A pass already in progress runs to completion.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn state(&self) -> ScannerState {
        *self.state.read().await
    }
}

/// Counters for a single scanner pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Symbols evaluated successfully (any signal).
    pub evaluated: usize,
    /// Evaluations that produced BUY or SELL.
    pub actionable: usize,
    /// Symbols that could not be evaluated.
    pub failed: usize,
    /// Messages accepted by a provider across all fan-outs.
    pub delivered: usize,
}

/// Periodically evaluates every watchlist symbol and fans actionable signals
/// out to all registered users.
///
/// Passes run inline on the scanner's own task, so a pass never overlaps the
/// next one: ticks that elapse while a pass is still running are skipped.
pub struct Scanner {
    exchange: Arc<dyn MarketData>,
    notifier: Notifier,
    watchlist: Vec<String>,
    params: EvaluationParams,
    interval: Duration,
    state: Arc<RwLock<ScannerState>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Scanner {
    pub fn new(
        exchange: Arc<dyn MarketData>,
        notifier: Notifier,
        cfg: &WatchlistConfig,
    ) -> (Self, ScannerHandle) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = Arc::new(RwLock::new(ScannerState::Idle));

        let handle = ScannerHandle {
            shutdown_tx: Arc::new(shutdown_tx),
            state: state.clone(),
        };

        let scanner = Scanner {
            exchange,
            notifier,
            watchlist: cfg.symbols.iter().map(|s| normalize(s)).collect(),
            params: EvaluationParams::from_config(cfg),
            interval: cfg.interval(),
            state,
            shutdown_rx,
        };

        (scanner, handle)
    }

    /// Run until stopped. The first pass starts immediately.
    /// Call from `tokio::spawn`.
    pub async fn run(self) {
        info!(
            symbols = ?self.watchlist,
            interval = ?self.interval,
            "Scanner started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut shutdown_rx = self.shutdown_rx.clone();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_pass().await;
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        *self.state.write().await = ScannerState::Stopped;
        info!("Scanner stopped");
    }

    /// Evaluate every watchlist symbol once.
    ///
    /// Failures are isolated per symbol and per user; nothing propagates.
    pub async fn run_pass(&self) -> PassReport {
        info!(symbols = self.watchlist.len(), "Scanner pass started");
        *self.state.write().await = ScannerState::Scanning;
        let report = self.scan().await;
        *self.state.write().await = ScannerState::Idle;

        info!(
            evaluated = report.evaluated,
            actionable = report.actionable,
            failed = report.failed,
            delivered = report.delivered,
            "Scanner pass complete"
        );
        report
    }

    async fn scan(&self) -> PassReport {
        let mut report = PassReport::default();

        let markets = match self.exchange.load_markets().await {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "Failed to load markets, skipping pass");
                report.failed = self.watchlist.len();
                return report;
            }
        };

        for symbol in &self.watchlist {
            let evaluation =
                match evaluate_symbol(self.exchange.as_ref(), &markets, symbol, &self.params).await {
                    Ok(e) => e,
                    Err(e) => {
                        warn!(symbol = %symbol, error = %e, "Symbol evaluation failed");
                        report.failed += 1;
                        continue;
                    }
                };

            report.evaluated += 1;
            if !evaluation.signal.is_actionable() {
                continue;
            }

            report.actionable += 1;
            info!(
                symbol = %evaluation.symbol,
                signal = %evaluation.signal,
                price = evaluation.price,
                "Actionable signal, notifying users"
            );
            let dispatch = self.notifier.broadcast(&evaluation.alert_text()).await;
            report.delivered += dispatch.delivered;
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use sqlx::sqlite::SqlitePoolOptions;
    use tokio::sync::Mutex;

    use common::{Candle, Error, MarketSet, NotificationPrefs, Result};
    use notifier::MessageChannel;
    use store::UserStore;

    /// Exchange fake: candles per symbol, `None` meaning the fetch fails.
    struct FakeExchange {
        markets: MarketSet,
        candles: HashMap<String, Option<Vec<Candle>>>,
        market_loads: AtomicUsize,
        fail_markets: bool,
    }

    impl FakeExchange {
        fn new(entries: &[(&str, Option<Vec<f64>>)]) -> Self {
            let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
            Self {
                markets: entries.iter().map(|(s, _)| s.to_string()).collect(),
                candles: entries
                    .iter()
                    .map(|(s, closes)| {
                        let series = closes.as_ref().map(|c| {
                            c.iter().map(|&p| Candle::from_close(ts, p)).collect()
                        });
                        (s.to_string(), series)
                    })
                    .collect(),
                market_loads: AtomicUsize::new(0),
                fail_markets: false,
            }
        }
    }

    #[async_trait]
    impl MarketData for FakeExchange {
        async fn load_markets(&self) -> Result<MarketSet> {
            self.market_loads.fetch_add(1, Ordering::SeqCst);
            if self.fail_markets {
                return Err(Error::Exchange("exchange unavailable".into()));
            }
            Ok(self.markets.clone())
        }

        async fn fetch_recent_candles(&self, symbol: &str, _tf: &str, _limit: usize) -> Result<Vec<Candle>> {
            match self.candles.get(symbol) {
                Some(Some(c)) => Ok(c.clone()),
                _ => Err(Error::Exchange(format!("HTTP 500: klines for {symbol}"))),
            }
        }

        async fn current_price(&self, _symbol: &str) -> Result<f64> {
            Ok(1.0)
        }
    }

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl MessageChannel for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn send(&self, destination: &str, text: &str) -> Result<()> {
            self.sent.lock().await.push((destination.into(), text.into()));
            Ok(())
        }
    }

    fn rising() -> Option<Vec<f64>> {
        Some((0..50).map(|i| 100.0 + i as f64).collect())
    }

    fn falling() -> Option<Vec<f64>> {
        Some((0..50).map(|i| 100.0 - i as f64).collect())
    }

    fn flat() -> Option<Vec<f64>> {
        Some(vec![10.0; 50])
    }

    async fn notifier_with_users(user_ids: &[i64]) -> (Notifier, Arc<Recorder>) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = UserStore::new(pool);
        store.migrate().await.unwrap();
        for &id in user_ids {
            let prefs = NotificationPrefs {
                notify_telegram: true,
                telegram_chat_id: Some(id.to_string()),
                ..NotificationPrefs::default()
            };
            store.upsert(id, &prefs).await.unwrap();
        }
        let recorder = Arc::new(Recorder::default());
        let notifier =
            Notifier::new(store, Duration::from_secs(1)).with_telegram(recorder.clone());
        (notifier, recorder)
    }

    fn watchlist(symbols: &[&str]) -> WatchlistConfig {
        WatchlistConfig {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            ..WatchlistConfig::default()
        }
    }

    #[tokio::test]
    async fn failing_symbol_does_not_abort_pass() {
        let exchange = Arc::new(FakeExchange::new(&[
            ("BTC/USDT", rising()),
            ("ETH/USDT", None),
            ("SOL/USDT", falling()),
        ]));
        let (notifier, recorder) = notifier_with_users(&[1, 2]).await;
        let (scanner, _handle) = Scanner::new(
            exchange,
            notifier,
            &watchlist(&["BTC-USDT", "ETH-USDT", "SOL/USDT"]),
        );

        let report = scanner.run_pass().await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.evaluated, 2);
        assert_eq!(report.actionable, 2);
        assert_eq!(report.delivered, 4);

        let sent = recorder.sent.lock().await;
        assert!(sent.iter().any(|(_, t)| t.contains("BUY") && t.contains("BTC/USDT")));
        assert!(sent.iter().any(|(_, t)| t.contains("SELL") && t.contains("SOL/USDT")));
        assert!(!sent.iter().any(|(_, t)| t.contains("ETH/USDT")));
    }

    #[tokio::test]
    async fn hold_does_not_notify() {
        let exchange = Arc::new(FakeExchange::new(&[("BTC/USDT", flat())]));
        let (notifier, recorder) = notifier_with_users(&[1]).await;
        let (scanner, _handle) = Scanner::new(exchange, notifier, &watchlist(&["BTC/USDT"]));

        let report = scanner.run_pass().await;

        assert_eq!(report.evaluated, 1);
        assert_eq!(report.actionable, 0);
        assert!(recorder.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn unresolvable_and_empty_symbols_are_isolated() {
        let exchange = Arc::new(FakeExchange::new(&[
            ("XBT/USDT", rising()),
            ("ADA/USDT", Some(Vec::new())),
        ]));
        let (notifier, recorder) = notifier_with_users(&[1]).await;
        let (scanner, _handle) = Scanner::new(
            exchange,
            notifier,
            &watchlist(&["DOGE/USDT", "ADA/USDT", "BTC/USDT"]),
        );

        let report = scanner.run_pass().await;

        // DOGE is unknown, ADA has no candles, BTC resolves to XBT via alias
        assert_eq!(report.failed, 2);
        assert_eq!(report.actionable, 1);
        let sent = recorder.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("XBT/USDT"));
    }

    #[tokio::test]
    async fn market_load_failure_fails_every_symbol() {
        let mut fake = FakeExchange::new(&[("BTC/USDT", rising())]);
        fake.fail_markets = true;
        let (notifier, recorder) = notifier_with_users(&[1]).await;
        let (scanner, handle) =
            Scanner::new(Arc::new(fake), notifier, &watchlist(&["BTC/USDT", "ETH/USDT"]));

        let report = scanner.run_pass().await;

        assert_eq!(report.failed, 2);
        assert!(recorder.sent.lock().await.is_empty());
        assert_eq!(handle.state().await, ScannerState::Idle);
    }

    #[tokio::test]
    async fn no_users_means_no_dispatch() {
        let exchange = Arc::new(FakeExchange::new(&[("BTC/USDT", rising())]));
        let (notifier, recorder) = notifier_with_users(&[]).await;
        let (scanner, _handle) = Scanner::new(exchange, notifier, &watchlist(&["BTC/USDT"]));

        let report = scanner.run_pass().await;

        assert_eq!(report.actionable, 1);
        assert_eq!(report.delivered, 0);
        assert!(recorder.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn run_scans_immediately_and_stops_on_request() {
        let exchange = Arc::new(FakeExchange::new(&[("BTC/USDT", flat())]));
        let (notifier, _recorder) = notifier_with_users(&[]).await;
        let (scanner, handle) =
            Scanner::new(exchange.clone(), notifier, &watchlist(&["BTC/USDT"]));

        let task = tokio::spawn(scanner.run());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(exchange.market_loads.load(Ordering::SeqCst), 1);

        handle.stop();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("scanner did not stop")
            .unwrap();
        assert_eq!(handle.state().await, ScannerState::Stopped);
    }

    /// Exchange whose first market load outlasts several scan intervals.
    struct StallingExchange {
        stall: Duration,
        started: Mutex<Vec<tokio::time::Instant>>,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    #[async_trait]
    impl MarketData for StallingExchange {
        async fn load_markets(&self) -> Result<MarketSet> {
            let first = {
                let mut started = self.started.lock().await;
                started.push(tokio::time::Instant::now());
                started.len() == 1
            };
            let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now_active, Ordering::SeqCst);
            if first {
                tokio::time::sleep(self.stall).await;
            }
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(MarketSet::new())
        }

        async fn fetch_recent_candles(&self, symbol: &str, _tf: &str, _limit: usize) -> Result<Vec<Candle>> {
            Err(Error::Exchange(format!("no klines for {symbol}")))
        }

        async fn current_price(&self, _symbol: &str) -> Result<f64> {
            Ok(1.0)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_pass_is_not_overlapped_and_missed_ticks_are_dropped() {
        let exchange = Arc::new(StallingExchange {
            stall: Duration::from_secs(150),
            started: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        });
        let notifier = Notifier::new(UserStore::unavailable(), Duration::from_secs(1));
        let cfg = WatchlistConfig {
            interval_secs: 60,
            ..watchlist(&["BTC/USDT"])
        };
        let (scanner, handle) = Scanner::new(exchange.clone(), notifier, &cfg);

        let origin = tokio::time::Instant::now();
        let task = tokio::spawn(scanner.run());
        tokio::time::sleep(Duration::from_secs(330)).await;
        handle.stop();
        task.await.unwrap();

        let offsets: Vec<u64> = exchange
            .started
            .lock()
            .await
            .iter()
            .map(|t| t.duration_since(origin).as_secs())
            .collect();

        // The ticks due at 60s and 120s collapse into one pass when the stall
        // ends at 150s; the schedule then resumes on the 60s grid.
        assert_eq!(offsets, vec![0, 150, 180, 240, 300]);
        assert_eq!(exchange.max_active.load(Ordering::SeqCst), 1);
        assert_eq!(handle.state().await, ScannerState::Stopped);
    }
}
