use axum::{
    extract::rejection::PathRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

/// Error surfaced to HTTP clients as `{"detail": "<message>"}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    /// An exchange, database or messaging dependency failed.
    Upstream(String),
    Internal(String),
}

impl From<common::Error> for ApiError {
    fn from(err: common::Error) -> Self {
        match &err {
            common::Error::SymbolNotFound(_) => ApiError::NotFound(err.to_string()),
            e if e.is_upstream() => ApiError::Upstream(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

/// Malformed path segments, e.g. `/signal/BTC/USDT` hitting the
/// `/signal/:user_id/:symbol` route with a non-numeric user id.
impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(format!(
            "{}. Write pair separators in symbols as '-' or '%2F'",
            rejection.body_text()
        ))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(msg) => {
                warn!(status_code = %StatusCode::BAD_REQUEST, message = %msg, "Bad request");
                (StatusCode::BAD_REQUEST, msg)
            }
            ApiError::NotFound(msg) => {
                warn!(status_code = %StatusCode::NOT_FOUND, message = %msg, "Resource not found");
                (StatusCode::NOT_FOUND, msg)
            }
            ApiError::Upstream(msg) => {
                error!(status_code = %StatusCode::INTERNAL_SERVER_ERROR, message = %msg, "Upstream dependency failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            ApiError::Internal(msg) => {
                error!(status_code = %StatusCode::INTERNAL_SERVER_ERROR, message = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<Json<T>, ApiError>;
