use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Response body for the health check endpoint.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Live-feed sessions currently registered.
    pub sessions: usize,
    /// Points currently held in history.
    pub history_len: usize,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        sessions: state.hub.session_count().await,
        history_len: state.history.len(),
    })
}

/// Health check routes, mounted on both listeners.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
