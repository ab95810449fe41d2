//! Threshold rule evaluation.
//!
//! Pure logic. Rules are loaded once by the caller and handed to
//! [`RuleEngine::new`]; every [`RuleEngine::check`] call is independent of
//! the previous ones.

use std::collections::HashMap;

use crate::alert::{Alert, Severity};
use crate::error::CoreError;
use crate::point::CanonicalPoint;

/// Admissible range for one metric.
///
/// The range is closed: values exactly equal to `min` or `max` are normal.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub metric_name: String,
    pub min: f64,
    pub max: f64,
}

impl Rule {
    /// Build a rule, rejecting non-finite bounds and `min > max`.
    pub fn new(metric_name: impl Into<String>, min: f64, max: f64) -> Result<Self, CoreError> {
        let metric_name = metric_name.into();
        if metric_name.is_empty() {
            return Err(CoreError::Validation("metric name is required".to_string()));
        }
        if !min.is_finite() || !max.is_finite() {
            return Err(CoreError::Validation(format!(
                "{metric_name}: bounds must be finite numbers"
            )));
        }
        if min > max {
            return Err(CoreError::Validation(format!(
                "{metric_name}: min ({min}) must not exceed max ({max})"
            )));
        }
        Ok(Self {
            metric_name,
            min,
            max,
        })
    }

    /// Whether `value` lies inside `[min, max]`.
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Rules keyed by exact metric name.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: HashMap<String, Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a rule set from `metric -> (min, max)` pairs, validating each.
    pub fn from_bounds<I, K>(bounds: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = (K, (f64, f64))>,
        K: Into<String>,
    {
        let mut set = Self::new();
        for (name, (min, max)) in bounds {
            set.insert(Rule::new(name, min, max)?);
        }
        Ok(set)
    }

    /// Add or replace the rule for `rule.metric_name`.
    pub fn insert(&mut self, rule: Rule) {
        self.rules.insert(rule.metric_name.clone(), rule);
    }

    pub fn get(&self, metric_name: &str) -> Option<&Rule> {
        self.rules.get(metric_name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Evaluates points against a fixed [`RuleSet`].
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: RuleSet,
}

impl RuleEngine {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Return one [`Alert`] per metric of `point` that falls outside its rule.
    ///
    /// Metrics without a rule are skipped. Metrics with a rule but a
    /// non-numeric value are skipped with a warning. Callers must not rely
    /// on the order of the returned alerts.
    pub fn check(&self, point: &CanonicalPoint) -> Vec<Alert> {
        let mut alerts = Vec::new();

        for (metric_name, value) in &point.metrics {
            let Some(rule) = self.rules.get(metric_name) else {
                continue;
            };

            let Some(number) = value.as_number() else {
                tracing::warn!(
                    metric = %metric_name,
                    kind = value.kind(),
                    "Skipping non-numeric metric for anomaly check"
                );
                continue;
            };

            if rule.contains(number) {
                continue;
            }

            let alert = Alert {
                timestamp: point.timestamp,
                severity: Severity::Warn,
                message: format!(
                    "Anomaly detected for {metric_name}: Value {number:.2} is outside range [{:.2}, {:.2}]",
                    rule.min, rule.max
                ),
                metric: metric_name.clone(),
                value: number,
                device_id: point.device_id.clone(),
            };
            tracing::warn!(
                metric = %metric_name,
                value = number,
                device_id = point.device_id.as_deref().unwrap_or(""),
                "ALERT: {}",
                alert.message
            );
            alerts.push(alert);
        }

        alerts
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
