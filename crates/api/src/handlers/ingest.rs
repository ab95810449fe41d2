//! Handler for `POST /data`.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::error::AppResult;
use crate::ingest::IngestReceipt;
use crate::middleware::api_key::RequireApiKey;
use crate::state::AppState;

/// Header naming the producer when `?source=` is absent.
pub const SOURCE_HEADER: &str = "x-source-identifier";

const UNKNOWN_SOURCE: &str = "unknown";

#[derive(Debug, Default, Deserialize)]
pub struct IngestQuery {
    pub source: Option<String>,
}

/// Accept one raw payload and run it through the pipeline.
pub async fn ingest_data(
    State(state): State<AppState>,
    _key: RequireApiKey,
    Query(query): Query<IngestQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<IngestReceipt>> {
    let source = resolve_source(query.source.as_deref(), &headers);

    let receipt = state.ingestor.ingest(&body, &source).inspect_err(|e| {
        tracing::warn!(source = %source, error = %e, "Rejected payload");
    })?;

    Ok(Json(receipt))
}

/// The query parameter wins over the header; blanks count as absent.
fn resolve_source(query: Option<&str>, headers: &HeaderMap) -> String {
    query
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get(SOURCE_HEADER)
                .and_then(|v| v.to_str().ok())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or(UNKNOWN_SOURCE)
        .to_string()
}
