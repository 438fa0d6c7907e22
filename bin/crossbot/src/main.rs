use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::{Config, MarketData};
use engine::{BinanceClient, EvaluationParams, Scanner};
use notifier::{Notifier, TelegramChannel, WhatsAppChannel};
use store::UserStore;
use strategy::WatchlistConfig;

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    info!(mode = %cfg.trading_mode, "Crossbot starting");

    let watchlist = WatchlistConfig::load(&cfg.watchlist_path)
        .unwrap_or_else(|e| panic!("Failed to load watchlist config: {e}"));

    // ── Database ──────────────────────────────────────────────────────────────
    let store = match &cfg.database_url {
        Some(url) => UserStore::connect(url, cfg.db_max_connections, cfg.upstream_timeout)
            .await
            .unwrap_or_else(|e| panic!("Failed to connect to database: {e}")),
        None => {
            warn!("DATABASE_URL not set; user settings will not be stored and no alerts will be sent");
            UserStore::unavailable()
        }
    };

    // ── Exchange client ───────────────────────────────────────────────────────
    if cfg.binance_secret.is_some() {
        info!("Binance secret configured but unused; only public endpoints are called");
    }
    let exchange: Arc<dyn MarketData> = Arc::new(
        BinanceClient::new(cfg.binance_api_key.clone(), cfg.upstream_timeout)
            .unwrap_or_else(|e| panic!("Failed to build Binance client: {e}")),
    );

    // ── Messaging channels ────────────────────────────────────────────────────
    let mut notifier = Notifier::new(store.clone(), cfg.upstream_timeout);
    match &cfg.twilio {
        Some(twilio) => {
            let channel = WhatsAppChannel::new(twilio, cfg.upstream_timeout)
                .unwrap_or_else(|e| panic!("Failed to build WhatsApp client: {e}"));
            notifier = notifier.with_whatsapp(Arc::new(channel));
            info!("WhatsApp channel enabled");
        }
        None => warn!("Twilio credentials not set; WhatsApp channel disabled"),
    }
    match &cfg.telegram_token {
        Some(token) => {
            notifier = notifier.with_telegram(Arc::new(TelegramChannel::new(token.clone())));
            info!("Telegram channel enabled");
        }
        None => warn!("TELEGRAM_TOKEN not set; Telegram channel disabled"),
    }

    // ── Scanner ───────────────────────────────────────────────────────────────
    let scanner = if watchlist.symbols.is_empty() {
        warn!("Watchlist is empty; background scanner disabled");
        None
    } else {
        let (scanner, handle) = Scanner::new(exchange.clone(), notifier.clone(), &watchlist);
        Some((tokio::spawn(scanner.run()), handle))
    };

    // ── HTTP API ──────────────────────────────────────────────────────────────
    let api_state = api::AppState {
        exchange,
        store: store.clone(),
        notifier,
        params: EvaluationParams::from_config(&watchlist),
        trading_mode: cfg.trading_mode,
        scanner: scanner.as_ref().map(|(_, handle)| handle.clone()),
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    if let Err(e) = api::serve(api_state, cfg.port, shutdown).await {
        warn!(error = %e, "HTTP server exited with error");
    }

    // ── Teardown ──────────────────────────────────────────────────────────────
    if let Some((task, handle)) = scanner {
        handle.stop();
        if let Err(e) = task.await {
            warn!(error = %e, "Scanner task ended abnormally");
        }
    }
    store.close().await;
    info!("Crossbot stopped");
}
