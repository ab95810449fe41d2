//! Live feed over WebSocket.
//!
//! - [`hub`]: session registry and non-blocking fan-out.
//! - [`session`]: per-connection read and write pumps.
//! - [`keepalive`]: ping, pong and write deadlines.

mod handler;
pub mod hub;
pub mod keepalive;
pub mod session;

pub use handler::live_feed_handler;
pub use hub::{Hub, SessionId, SessionQueue, WeakHub, SESSION_QUEUE_CAPACITY};
pub use keepalive::KeepaliveConfig;
