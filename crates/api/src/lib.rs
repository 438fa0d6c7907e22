mod error;
pub mod routes;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use common::{MarketData, TradingMode};
use engine::{EvaluationParams, ScannerHandle};
use notifier::Notifier;
use store::UserStore;

pub use error::{ApiError, ApiResult};

/// Shared application state injected into every route handler.
#[derive(Clone)]
pub struct AppState {
    pub exchange: Arc<dyn MarketData>,
    pub store: UserStore,
    pub notifier: Notifier,
    /// Candle window and EMA spans used by on-demand evaluations.
    pub params: EvaluationParams,
    pub trading_mode: TradingMode,
    /// Present when the background scanner is running.
    pub scanner: Option<ScannerHandle>,
}

/// All routes with permissive CORS.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any);

    Router::new()
        .merge(routes::health_router())
        .merge(routes::market_router())
        .merge(routes::settings_router())
        .with_state(state)
        .layer(cors)
}

/// Build and run the Axum API server until `shutdown` resolves.
pub async fn serve(
    state: AppState,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(state);

    info!(%addr, "HTTP API listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
