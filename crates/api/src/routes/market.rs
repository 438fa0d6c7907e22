use axum::{
    extract::{rejection::PathRejection, Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use common::{Evaluation, Signal};
use engine::{evaluate_symbol, resolve};

use crate::{ApiError, ApiResult, AppState};

pub fn market_router() -> Router<AppState> {
    Router::new()
        .route("/markets", get(list_markets))
        .route("/price/:symbol", get(get_price))
        .route("/signal/:symbol", get(get_signal))
        .route("/signal/:user_id/:symbol", get(get_signal_and_notify))
}

#[derive(Debug, Serialize)]
struct SignalResponse {
    symbol: String,
    signal: Signal,
    price: f64,
    short_ema: f64,
    long_ema: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    notified: Option<bool>,
}

impl SignalResponse {
    fn new(eval: Evaluation, notified: Option<bool>) -> Self {
        Self {
            symbol: eval.symbol,
            signal: eval.signal,
            price: eval.price,
            short_ema: eval.short_ema,
            long_ema: eval.long_ema,
            notified,
        }
    }
}

// ─── Markets ──────────────────────────────────────────────────────────────────

async fn list_markets(State(state): State<AppState>) -> ApiResult<Value> {
    let markets = state.exchange.load_markets().await?;
    Ok(Json(json!({
        "count": markets.len(),
        "markets": markets,
    })))
}

// ─── Price ────────────────────────────────────────────────────────────────────

async fn get_price(State(state): State<AppState>, Path(symbol): Path<String>) -> ApiResult<Value> {
    let markets = state.exchange.load_markets().await?;
    let resolved = resolve(&symbol, &markets)?;
    let price = state.exchange.current_price(&resolved).await?;
    Ok(Json(json!({ "symbol": resolved, "price": price })))
}

// ─── Signal ───────────────────────────────────────────────────────────────────

async fn evaluate(state: &AppState, symbol: &str) -> Result<Evaluation, ApiError> {
    let markets = state.exchange.load_markets().await?;
    Ok(evaluate_symbol(state.exchange.as_ref(), &markets, symbol, &state.params).await?)
}

/// Evaluate only; nobody is notified.
async fn get_signal(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> ApiResult<SignalResponse> {
    let eval = evaluate(&state, &symbol).await?;
    Ok(Json(SignalResponse::new(eval, None)))
}

/// Evaluate and, on BUY or SELL, notify `user_id` right away.
///
/// Delivery runs on its own task so a client disconnect drops only the wait,
/// never a dispatch already in flight.
async fn get_signal_and_notify(
    State(state): State<AppState>,
    path: Result<Path<(i64, String)>, PathRejection>,
) -> ApiResult<SignalResponse> {
    let Path((user_id, symbol)) = path?;
    let eval = evaluate(&state, &symbol).await?;

    if !eval.signal.is_actionable() {
        return Ok(Json(SignalResponse::new(eval, Some(false))));
    }

    info!(user_id, symbol = %eval.symbol, signal = %eval.signal, "On-demand signal, notifying user");
    let notifier = state.notifier.clone();
    let text = eval.alert_text();
    let report = tokio::spawn(async move { notifier.notify(user_id, &text).await })
        .await
        .map_err(|e| ApiError::Internal(format!("notification task failed: {e}")))?;

    Ok(Json(SignalResponse::new(eval, Some(report.delivered > 0))))
}
