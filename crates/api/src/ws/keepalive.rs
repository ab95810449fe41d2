use std::time::Duration;

/// Default time allowed for a single write to the peer.
pub const WRITE_WAIT: Duration = Duration::from_secs(10);

/// Default time allowed between frames that prove the peer is alive.
pub const PONG_WAIT: Duration = Duration::from_secs(60);

/// Largest inbound frame accepted from an observer, in bytes.
pub const MAX_MESSAGE_SIZE: usize = 512;

/// Timing parameters for live-feed sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepaliveConfig {
    pub write_wait: Duration,
    pub pong_wait: Duration,
}

impl KeepaliveConfig {
    /// Interval between server pings. Always shorter than `pong_wait` so a
    /// healthy peer's pong lands before the read deadline.
    pub fn ping_period(&self) -> Duration {
        self.pong_wait * 9 / 10
    }
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            write_wait: WRITE_WAIT,
            pong_wait: PONG_WAIT,
        }
    }
}
