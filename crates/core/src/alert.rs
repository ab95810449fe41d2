//! Alert types for threshold violation notifications.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Severity level for a threshold violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Value left its configured range.
    Warn,
    /// Reserved for sinks that escalate; the rule engine only emits `Warn`.
    Critical,
}

/// A single metric that violated its rule on one point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Timestamp of the offending point.
    pub timestamp: Timestamp,
    pub severity: Severity,
    /// Human-readable description including the value and violated range.
    pub message: String,
    /// Name of the metric that triggered the alert.
    pub metric: String,
    /// The observed value.
    pub value: f64,
    /// Device of the offending point, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}
