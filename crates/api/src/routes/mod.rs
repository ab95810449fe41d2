pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Routes served on the ingestion listener.
///
/// ```text
/// POST /data     ingest one payload (?source= or X-Source-Identifier)
/// ```
pub fn data_routes() -> Router<AppState> {
    Router::new().route("/data", post(handlers::ingest::ingest_data))
}

/// Routes served on the live-feed listener.
///
/// ```text
/// GET /ws        WebSocket live feed
/// GET /history   recent points (?limit=N)
/// ```
pub fn live_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::live_feed_handler))
        .route("/history", get(handlers::history::recent_points))
}
