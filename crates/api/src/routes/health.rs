use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::AppState;

pub fn health_router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// Liveness check. Never touches upstream services.
async fn health(State(state): State<AppState>) -> Json<Value> {
    let scanner = match &state.scanner {
        Some(handle) => handle.state().await.to_string(),
        None => "disabled".to_string(),
    };
    Json(json!({
        "status": "ok",
        "mode": state.trading_mode.to_string(),
        "store": state.store.is_configured(),
        "scanner": scanner,
    }))
}
