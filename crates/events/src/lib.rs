//! Live-feed wire format and alert fan-out.
//!
//! - [`Envelope`]: the `{type, payload}` wrapper every live-feed message
//!   is sent in.
//! - [`AlertDispatcher`]: forwards alerts to every registered
//!   [`AlertSink`].

pub mod dispatcher;
pub mod envelope;

pub use dispatcher::{AlertDispatcher, AlertSink};
pub use envelope::Envelope;
