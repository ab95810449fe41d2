//! HTTP and WebSocket surface of the telemetry gateway.
//!
//! Two listeners share one [`state::AppState`]: the ingestion listener
//! accepts raw payloads on `POST /data`, the live-feed listener pushes
//! points and alerts to observers on `GET /ws`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod ws;
