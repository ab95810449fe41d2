//! Domain core of the telemetry gateway.
//!
//! Everything in this crate is pure in-memory logic with no I/O and no
//! async: payload normalisation ([`parser`]), threshold rules
//! ([`rules`]), the bounded history buffer ([`history`]) and the value
//! types that flow between them.

pub mod alert;
pub mod error;
pub mod history;
pub mod parser;
pub mod point;
pub mod rules;
pub mod types;

pub use alert::{Alert, Severity};
pub use error::CoreError;
pub use history::HistoryBuffer;
pub use parser::{parse, ParseError, ParseWarning, Parsed};
pub use point::{CanonicalPoint, MetricValue};
pub use rules::{Rule, RuleEngine, RuleSet};
