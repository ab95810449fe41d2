//! Wire envelope for the live feed.

use std::sync::Arc;

use iotgw_core::{Alert, CanonicalPoint};
use serde::Serialize;

/// A message pushed to live observers, serialized as
/// `{"type": "data" | "alert" | "history", "payload": ...}`.
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum Envelope<'a> {
    /// A freshly ingested point.
    Data(&'a CanonicalPoint),
    /// A rule violation.
    Alert(&'a Alert),
    /// Snapshot of recent points sent once when an observer connects.
    History(&'a [Arc<CanonicalPoint>]),
}

impl Envelope<'_> {
    /// Value of the `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::Data(_) => "data",
            Envelope::Alert(_) => "alert",
            Envelope::History(_) => "history",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
