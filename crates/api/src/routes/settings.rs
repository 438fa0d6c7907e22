use axum::{
    extract::{rejection::PathRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::info;

use common::{NotificationPrefs, UserSettings};

use crate::{ApiError, ApiResult, AppState};

pub fn settings_router() -> Router<AppState> {
    Router::new()
        .route("/settings/update/:user_id", post(update_settings))
        .route("/settings/get/:user_id", get(get_settings))
}

/// Full replace of a user's notification preferences.
async fn update_settings(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    Json(prefs): Json<NotificationPrefs>,
) -> ApiResult<Value> {
    let Path(user_id) = path?;
    state.store.upsert(user_id, &prefs).await?;
    info!(user_id, persisted = state.store.is_configured(), "Settings updated");
    Ok(Json(json!({
        "status": "ok",
        "user_id": user_id,
        "persisted": state.store.is_configured(),
    })))
}

async fn get_settings(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<UserSettings> {
    let Path(user_id) = path?;
    state
        .store
        .get(user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Settings for user {user_id} not found")))
}
