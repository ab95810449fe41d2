//! The ingestion pipeline: parse, store, check, broadcast.

use std::sync::Arc;

use iotgw_core::{parse, HistoryBuffer, ParseError, Parsed, RuleEngine};
use iotgw_events::AlertDispatcher;
use serde::Serialize;

use crate::ws::Hub;

/// Acknowledgement returned to the producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReceipt {
    pub status: &'static str,
    pub source: String,
}

/// Runs each accepted payload through the pipeline.
///
/// Steps happen in a fixed order: the point is in history before any alert
/// for it goes out, and alerts go out before the point itself.
#[derive(Debug)]
pub struct Ingestor {
    history: Arc<HistoryBuffer>,
    rules: RuleEngine,
    dispatcher: AlertDispatcher,
    hub: Hub,
}

impl Ingestor {
    pub fn new(
        history: Arc<HistoryBuffer>,
        rules: RuleEngine,
        dispatcher: AlertDispatcher,
        hub: Hub,
    ) -> Self {
        Self {
            history,
            rules,
            dispatcher,
            hub,
        }
    }

    /// Process one payload from `source`.
    ///
    /// Only a payload that is not a JSON object is rejected. Points without
    /// an identity get `device_from_<source>`.
    pub fn ingest(&self, raw: &[u8], source: &str) -> Result<IngestReceipt, ParseError> {
        let Parsed { mut point, warnings } = parse(raw, source)?;
        if point.device_id.is_none() {
            point.device_id = Some(format!("device_from_{source}"));
        }
        let point = Arc::new(point);

        self.history.add(Arc::clone(&point));

        let alerts = self.rules.check(&point);
        self.dispatcher.process_alerts(&alerts);

        self.hub.broadcast_data(&point);

        tracing::debug!(
            source,
            device_id = point.device_id.as_deref().unwrap_or_default(),
            metrics = point.metrics.len(),
            warnings = warnings.len(),
            alerts = alerts.len(),
            "Point ingested"
        );

        Ok(IngestReceipt {
            status: "received",
            source: source.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
