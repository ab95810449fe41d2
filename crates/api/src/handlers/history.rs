//! Handler for `GET /history`.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use iotgw_core::CanonicalPoint;
use serde::Deserialize;

use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// Return at most this many of the newest points.
    pub limit: Option<usize>,
}

/// Current contents of the history buffer, oldest first.
pub async fn recent_points(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<DataResponse<Vec<Arc<CanonicalPoint>>>> {
    let data = match query.limit {
        Some(limit) => state.history.get_recent(limit),
        None => state.history.get_all(),
    };
    Json(DataResponse { data })
}
