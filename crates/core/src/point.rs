//! The canonical telemetry point produced for every ingested payload.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// A single metric reading.
///
/// Producers send loosely-typed JSON, so a metric can be a number, a
/// string or a boolean. Integers and floats both collapse into
/// [`MetricValue::Number`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
    Flag(bool),
}

impl MetricValue {
    /// The value as a float, if it is numeric.
    ///
    /// Text and boolean readings are never coerced, so they bypass
    /// threshold evaluation.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            MetricValue::Number(n) => Some(*n),
            MetricValue::Text(_) | MetricValue::Flag(_) => None,
        }
    }

    /// Short name of the variant, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            MetricValue::Number(_) => "number",
            MetricValue::Text(_) => "text",
            MetricValue::Flag(_) => "flag",
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Number(value)
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        MetricValue::Text(value.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(value: String) -> Self {
        MetricValue::Text(value)
    }
}

impl From<bool> for MetricValue {
    fn from(value: bool) -> Self {
        MetricValue::Flag(value)
    }
}

/// Normalised representation of one ingested telemetry reading.
///
/// Built once by [`crate::parser::parse`] and never mutated afterwards;
/// the pipeline shares it behind an `Arc` between the history buffer,
/// the rule engine and the broadcast hub.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalPoint {
    /// Reading time. Falls back to ingestion time when the payload carries
    /// no usable timestamp.
    pub timestamp: Timestamp,
    /// Tag of the producer the payload arrived from (e.g. `"mqtt"`).
    pub source: String,
    /// Device identity, from `device_id` or `sensor_id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Metric name to reading. May legitimately be empty.
    pub metrics: BTreeMap<String, MetricValue>,
    /// The bytes exactly as received.
    #[serde(skip)]
    pub raw_payload: Vec<u8>,
}

impl CanonicalPoint {
    /// Look up a metric by name.
    pub fn metric(&self, name: &str) -> Option<&MetricValue> {
        self.metrics.get(name)
    }
}
