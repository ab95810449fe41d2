use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::IntoResponse;

use super::keepalive::MAX_MESSAGE_SIZE;
use super::session::run_session;
use crate::state::AppState;

/// HTTP handler for `GET /ws`.
///
/// Upgrades the connection and hands the socket to a live-feed session.
/// The session only gets a weak reference to the hub.
pub async fn live_feed_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let hub = state.hub.downgrade();
    let history = Arc::clone(&state.history);
    let keepalive = state.config.keepalive;

    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| run_session(socket, hub, history, keepalive))
}
