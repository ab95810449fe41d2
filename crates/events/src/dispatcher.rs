//! Alert fan-out to notification sinks.
//!
//! The rule engine produces alerts; [`AlertDispatcher`] hands each one to
//! every configured [`AlertSink`]. New channels (paging, email) plug in as
//! additional sinks without touching the rule engine or the hub.

use std::sync::Arc;

use iotgw_core::Alert;

/// A destination for alerts.
///
/// `deliver` is called on the ingestion path and must not block.
pub trait AlertSink: Send + Sync {
    /// Short name used in log fields.
    fn name(&self) -> &str;

    fn deliver(&self, alert: &Alert);
}

/// Forwards alerts to all registered sinks.
#[derive(Clone, Default)]
pub struct AlertDispatcher {
    sinks: Vec<Arc<dyn AlertSink>>,
}

impl AlertDispatcher {
    /// Create a dispatcher with no sinks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an additional sink.
    pub fn with_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Send every alert to every sink. No-op on an empty slice.
    pub fn process_alerts(&self, alerts: &[Alert]) {
        if alerts.is_empty() {
            return;
        }

        tracing::info!(count = alerts.len(), "Processing alerts");
        for alert in alerts {
            for sink in &self.sinks {
                tracing::debug!(sink = sink.name(), metric = %alert.metric, "Dispatching alert");
                sink.deliver(alert);
            }
        }
    }
}

impl std::fmt::Debug for AlertDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertDispatcher")
            .field("sinks", &self.sinks.iter().map(|s| s.name()).collect::<Vec<_>>())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;
    use iotgw_core::Severity;

    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        received: Mutex<Vec<String>>,
    }

    impl AlertSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        fn deliver(&self, alert: &Alert) {
            self.received.lock().unwrap().push(alert.metric.clone());
        }
    }

    fn alert(metric: &str) -> Alert {
        Alert {
            timestamp: Utc::now(),
            severity: Severity::Warn,
            message: format!("{metric} out of range"),
            metric: metric.to_string(),
            value: 1.0,
            device_id: None,
        }
    }

    #[test]
    fn every_sink_receives_every_alert() {
        let first = Arc::new(RecordingSink::default());
        let second = Arc::new(RecordingSink::default());
        let dispatcher = AlertDispatcher::new()
            .with_sink(first.clone())
            .with_sink(second.clone());

        dispatcher.process_alerts(&[alert("temperature"), alert("humidity")]);

        for sink in [&first, &second] {
            assert_eq!(
                *sink.received.lock().unwrap(),
                vec!["temperature".to_string(), "humidity".to_string()]
            );
        }
    }

    #[test]
    fn empty_input_is_a_noop() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = AlertDispatcher::new().with_sink(sink.clone());

        dispatcher.process_alerts(&[]);

        assert!(sink.received.lock().unwrap().is_empty());
    }

    #[test]
    fn dispatcher_without_sinks_does_not_panic() {
        let dispatcher = AlertDispatcher::new();
        assert_eq!(dispatcher.sink_count(), 0);
        dispatcher.process_alerts(&[alert("temperature")]);
    }
}
