//! Shared-secret check for the ingestion endpoint.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sha2::{Digest, Sha256};

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the producer's key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Extractor that passes only when the request carries the configured key.
///
/// When no key is configured every request passes.
///
/// ```ignore
/// async fn ingest(_key: RequireApiKey, body: Bytes) -> AppResult<Json<()>> { ... }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireApiKey;

impl FromRequestParts<AppState> for RequireApiKey {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.api_key.as_deref() else {
            return Ok(RequireApiKey);
        };

        let provided = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                tracing::warn!("Rejected ingestion without API key");
                AppError::Forbidden("Missing API Key".into())
            })?;

        if !keys_match(provided, expected) {
            tracing::warn!("Rejected ingestion with invalid API key");
            return Err(AppError::Forbidden("Invalid API Key".into()));
        }

        Ok(RequireApiKey)
    }
}

/// Compare fixed-length digests rather than the raw strings.
fn keys_match(provided: &str, expected: &str) -> bool {
    Sha256::digest(provided.as_bytes()) == Sha256::digest(expected.as_bytes())
}
