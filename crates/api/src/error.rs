use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use iotgw_core::ParseError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce consistent
/// `{"error": ..., "code": ...}` JSON bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The ingestion body could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The caller failed the API-key check.
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Parse(err) => (
                StatusCode::BAD_REQUEST,
                "INVALID_PAYLOAD",
                format!("Cannot parse payload: {err}"),
            ),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
