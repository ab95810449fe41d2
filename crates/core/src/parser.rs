//! Payload normaliser.
//!
//! Turns an arbitrary JSON object plus a source tag into a
//! [`CanonicalPoint`]. Only a payload that is not a JSON object is
//! rejected; every other irregularity (unknown timestamp layout, nested
//! values, no metrics at all) degrades to a [`ParseWarning`].

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::point::{CanonicalPoint, MetricValue};
use crate::types::Timestamp;

/// Identity keys, in priority order.
const IDENTITY_KEYS: [&str; 2] = ["device_id", "sensor_id"];

const TIMESTAMP_KEY: &str = "timestamp";

/// Zone-less layouts tried after RFC 3339. Parsed values are taken as UTC.
const NAIVE_LAYOUTS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// The payload could not be turned into a point at all.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid JSON format: {0}")]
    InvalidFormat(String),
}

/// A recoverable irregularity found while normalising a payload.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseWarning {
    #[error("unrecognised timestamp {raw}, using ingestion time")]
    TimestampFormat { raw: String },

    #[error("metric '{metric}' has unsupported type {kind}, dropped")]
    UnsupportedMetricType { metric: String, kind: &'static str },

    #[error("no metrics extracted from payload")]
    NoMetrics,
}

/// Result of a successful parse.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub point: CanonicalPoint,
    /// Everything that was defaulted or dropped along the way. Each entry
    /// has already been logged.
    pub warnings: Vec<ParseWarning>,
}

/// Normalise `raw` received from `source`.
///
/// - `device_id`, then `sensor_id`, supplies the device identity when it
///   holds a string; the matched key is not treated as a metric.
/// - `timestamp` is tried as RFC 3339 (with or without fractional
///   seconds), then `YYYY-MM-DDTHH:MM:SS`, then `YYYY-MM-DD HH:MM:SS`;
///   numbers are Unix epoch seconds. The key is never treated as a metric.
/// - Every other scalar field becomes a metric. Arrays, objects and nulls
///   are dropped.
pub fn parse(raw: &[u8], source: &str) -> Result<Parsed, ParseError> {
    let value: Value =
        serde_json::from_slice(raw).map_err(|e| ParseError::InvalidFormat(e.to_string()))?;

    let mut fields = match value {
        Value::Object(fields) => fields,
        other => {
            return Err(ParseError::InvalidFormat(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            )))
        }
    };

    let mut warnings = Vec::new();

    let device_id = take_identity(&mut fields);

    let mut timestamp = Utc::now();
    if let Some(raw_ts) = fields.remove(TIMESTAMP_KEY) {
        match parse_timestamp(&raw_ts) {
            Some(ts) => timestamp = ts,
            None => warnings.push(ParseWarning::TimestampFormat {
                raw: raw_ts.to_string(),
            }),
        }
    }

    let mut metrics = BTreeMap::new();
    for (name, value) in fields {
        match metric_value(value) {
            Ok(metric) => {
                metrics.insert(name, metric);
            }
            Err(kind) => warnings.push(ParseWarning::UnsupportedMetricType { metric: name, kind }),
        }
    }

    if metrics.is_empty() {
        warnings.push(ParseWarning::NoMetrics);
    }

    for warning in &warnings {
        tracing::warn!(source = %source, %warning, "Payload normalisation warning");
    }

    let point = CanonicalPoint {
        timestamp,
        source: source.to_string(),
        device_id,
        metrics,
        raw_payload: raw.to_vec(),
    };

    tracing::debug!(
        source = %source,
        device_id = point.device_id.as_deref().unwrap_or(""),
        timestamp = %point.timestamp.to_rfc3339(),
        metric_count = point.metrics.len(),
        "Parsed payload"
    );

    Ok(Parsed { point, warnings })
}

/// Remove and return the first identity key present.
///
/// Only string identities count. A key holding any other type stays in
/// the field set and the next key is tried. An empty string counts as no
/// identity.
fn take_identity(fields: &mut Map<String, Value>) -> Option<String> {
    for key in IDENTITY_KEYS {
        let id = match fields.get(key) {
            Some(Value::String(s)) => s.clone(),
            _ => continue,
        };
        fields.remove(key);
        return (!id.is_empty()).then_some(id);
    }
    None
}

fn parse_timestamp(value: &Value) -> Option<Timestamp> {
    match value {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => n.as_f64().and_then(from_epoch_seconds),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<Timestamp> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(s, layout).ok())
        .map(|naive| naive.and_utc())
}

/// Fractional seconds carry sub-second precision.
fn from_epoch_seconds(secs: f64) -> Option<Timestamp> {
    if !secs.is_finite() {
        return None;
    }
    let mut whole = secs.floor();
    let mut nanos = ((secs - whole) * 1e9).round() as u32;
    if nanos >= 1_000_000_000 {
        whole += 1.0;
        nanos = 0;
    }
    DateTime::from_timestamp(whole as i64, nanos)
}

/// Convert a JSON value into a metric, or name its kind if unsupported.
fn metric_value(value: Value) -> Result<MetricValue, &'static str> {
    match value {
        Value::Number(n) => n.as_f64().map(MetricValue::Number).ok_or("number"),
        Value::String(s) => Ok(MetricValue::Text(s)),
        Value::Bool(b) => Ok(MetricValue::Flag(b)),
        other => Err(json_kind(&other)),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    use super::*;

    fn parse_ok(raw: &str) -> Parsed {
        parse(raw.as_bytes(), "test").expect("payload should parse")
    }

    #[test]
    fn normalises_device_timestamp_and_metric() {
        let parsed = parse_ok(
            r#"{"device_id":"d1","timestamp":"2024-01-01T00:00:00Z","temperature":21.5}"#,
        );
        let point = parsed.point;

        assert_eq!(point.device_id.as_deref(), Some("d1"));
        assert_eq!(point.timestamp, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(point.source, "test");
        assert_eq!(point.metrics.len(), 1);
        assert_eq!(point.metric("temperature"), Some(&MetricValue::Number(21.5)));
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn rejects_malformed_json() {
        assert_matches!(
            parse(b"{not json", "test"),
            Err(ParseError::InvalidFormat(_))
        );
    }

    #[test]
    fn rejects_non_object_json() {
        assert_matches!(parse(b"[1, 2, 3]", "test"), Err(ParseError::InvalidFormat(msg)) if msg.contains("array"));
        assert_matches!(parse(b"42", "test"), Err(ParseError::InvalidFormat(_)));
    }

    #[test]
    fn device_id_wins_over_sensor_id() {
        let point = parse_ok(r#"{"device_id":"dev","sensor_id":"sen","v":1}"#).point;

        assert_eq!(point.device_id.as_deref(), Some("dev"));
        // The losing identity key is an ordinary field.
        assert_eq!(point.metric("sensor_id"), Some(&MetricValue::from("sen")));
        assert!(point.metric("device_id").is_none());
    }

    #[test]
    fn sensor_id_used_when_device_id_absent() {
        let point = parse_ok(r#"{"sensor_id":"s-7","v":1}"#).point;

        assert_eq!(point.device_id.as_deref(), Some("s-7"));
        assert!(point.metric("sensor_id").is_none());
    }

    #[test]
    fn numeric_device_id_is_a_metric_not_an_identity() {
        let point = parse_ok(r#"{"device_id":17,"sensor_id":"s-7","v":1}"#).point;

        assert_eq!(point.device_id.as_deref(), Some("s-7"));
        assert_eq!(point.metric("device_id"), Some(&MetricValue::Number(17.0)));
        assert!(point.metric("sensor_id").is_none());

        let point = parse_ok(r#"{"device_id":17,"v":1}"#).point;
        assert!(point.device_id.is_none());
        assert_eq!(point.metric("device_id"), Some(&MetricValue::Number(17.0)));
    }

    #[test]
    fn missing_identity_leaves_device_empty() {
        let point = parse_ok(r#"{"v":1}"#).point;
        assert!(point.device_id.is_none());
    }

    #[test]
    fn integers_are_normalised_to_floats() {
        let point = parse_ok(r#"{"count":3,"ratio":0.25}"#).point;

        assert_eq!(point.metric("count"), Some(&MetricValue::Number(3.0)));
        assert_eq!(point.metric("ratio"), Some(&MetricValue::Number(0.25)));
    }

    #[test]
    fn strings_and_booleans_are_kept() {
        let point = parse_ok(r#"{"status":"ok","door_open":true}"#).point;

        assert_eq!(point.metric("status"), Some(&MetricValue::from("ok")));
        assert_eq!(point.metric("door_open"), Some(&MetricValue::Flag(true)));
    }

    #[test]
    fn nested_and_null_values_are_dropped_with_warnings() {
        let parsed = parse_ok(r#"{"temp":20,"tags":["a"],"meta":{"x":1},"gone":null}"#);

        assert_eq!(parsed.point.metrics.len(), 1);
        assert_eq!(parsed.warnings.len(), 3);
        assert!(parsed.warnings.contains(&ParseWarning::UnsupportedMetricType {
            metric: "tags".into(),
            kind: "array",
        }));
        assert!(parsed.warnings.contains(&ParseWarning::UnsupportedMetricType {
            metric: "meta".into(),
            kind: "object",
        }));
        assert!(parsed.warnings.contains(&ParseWarning::UnsupportedMetricType {
            metric: "gone".into(),
            kind: "null",
        }));
    }

    #[test]
    fn empty_metrics_is_a_warning_not_an_error() {
        let parsed = parse_ok(r#"{"device_id":"d1"}"#);

        assert!(parsed.point.metrics.is_empty());
        assert_eq!(parsed.warnings, vec![ParseWarning::NoMetrics]);
    }

    #[test]
    fn rfc3339_with_fraction_and_offset() {
        let point = parse_ok(r#"{"timestamp":"2024-03-05T10:20:30.250+02:00","v":1}"#).point;

        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 8, 20, 30).unwrap()
            + chrono::Duration::milliseconds(250);
        assert_eq!(point.timestamp, expected);
    }

    #[test]
    fn zoneless_layouts_are_utc() {
        let expected = Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap();

        let t_sep = parse_ok(r#"{"timestamp":"2024-06-01T12:30:00","v":1}"#).point;
        let space_sep = parse_ok(r#"{"timestamp":"2024-06-01 12:30:00","v":1}"#).point;

        assert_eq!(t_sep.timestamp, expected);
        assert_eq!(space_sep.timestamp, expected);
    }

    #[test]
    fn numeric_timestamp_is_epoch_seconds() {
        let whole = parse_ok(r#"{"timestamp":1704067200,"v":1}"#).point;
        let fractional = parse_ok(r#"{"timestamp":1704067200.5,"v":1}"#).point;

        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(whole.timestamp, base);
        assert_eq!(fractional.timestamp, base + chrono::Duration::milliseconds(500));
    }

    #[test]
    fn unparsable_timestamp_defaults_to_now_and_is_not_a_metric() {
        let before = Utc::now();
        let parsed = parse_ok(r#"{"timestamp":"yesterday-ish","v":1}"#);
        let after = Utc::now();

        assert!(parsed.point.timestamp >= before && parsed.point.timestamp <= after);
        assert!(parsed.point.metric("timestamp").is_none());
        assert_eq!(
            parsed.warnings,
            vec![ParseWarning::TimestampFormat {
                raw: "\"yesterday-ish\"".into()
            }]
        );
    }

    #[test]
    fn boolean_timestamp_is_rejected_with_warning() {
        let parsed = parse_ok(r#"{"timestamp":true,"v":1}"#);
        assert_matches!(parsed.warnings.as_slice(), [ParseWarning::TimestampFormat { .. }]);
    }

    #[test]
    fn parsing_is_idempotent_when_timestamp_present() {
        let raw = br#"{"sensor_id":"s1","timestamp":"2024-01-01T00:00:00Z","t":1,"ok":true}"#;

        let first = parse(raw, "mqtt").unwrap().point;
        let second = parse(raw, "mqtt").unwrap().point;

        assert_eq!(first, second);
    }

    #[test]
    fn parsing_is_idempotent_apart_from_defaulted_timestamp() {
        let raw = br#"{"sensor_id":"s1","t":1}"#;

        let first = parse(raw, "mqtt").unwrap().point;
        let mut second = parse(raw, "mqtt").unwrap().point;
        second.timestamp = first.timestamp;

        assert_eq!(first, second);
    }

    #[test]
    fn raw_payload_is_retained() {
        let raw = br#"{"v":1}"#;
        let point = parse(raw, "test").unwrap().point;
        assert_eq!(point.raw_payload, raw.to_vec());
    }
}
