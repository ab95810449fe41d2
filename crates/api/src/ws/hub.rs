//! Broadcast hub for live-feed sessions.
//!
//! The hub is a single task that owns the session registry. Everything
//! else talks to it through an unbounded command channel, so registry
//! mutations and fan-out are applied in the order they were requested and
//! never interleave. A broadcast never waits on a slow observer: each
//! session has a bounded outbound queue, and a session whose queue is full
//! is evicted on the spot.
//!
//! The command channel itself is unbounded so producers never wait on the
//! hub. If the control loop falls behind, pending broadcasts accumulate in
//! memory until it catches up.

use std::collections::HashMap;

use axum::extract::ws::Utf8Bytes;
use iotgw_core::{Alert, CanonicalPoint};
use iotgw_events::{AlertSink, Envelope};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Unique identifier for a live-feed session.
pub type SessionId = Uuid;

/// Producer side of a session's outbound queue.
pub type SessionQueue = mpsc::Sender<Utf8Bytes>;

/// Capacity of each session's outbound queue.
pub const SESSION_QUEUE_CAPACITY: usize = 256;

enum Command {
    Register { id: SessionId, queue: SessionQueue },
    Unregister(SessionId),
    Broadcast(Utf8Bytes),
    CloseAll,
    Count(oneshot::Sender<usize>),
}

/// Handle to the running hub. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Hub {
    commands: mpsc::UnboundedSender<Command>,
}

/// Non-owning handle held by sessions.
///
/// It does not keep the hub alive; once every [`Hub`] is dropped the
/// control loop exits and calls through a `WeakHub` become no-ops.
#[derive(Debug, Clone)]
pub struct WeakHub {
    commands: mpsc::WeakUnboundedSender<Command>,
}

impl Hub {
    /// Start the control loop on the current Tokio runtime.
    pub fn spawn() -> Self {
        let (commands, inbox) = mpsc::unbounded_channel();
        tokio::spawn(run(inbox));
        Self { commands }
    }

    /// Add a session. Registering an id twice replaces its queue.
    pub fn register(&self, id: SessionId, queue: SessionQueue) {
        self.send(Command::Register { id, queue });
    }

    /// Remove a session and close its queue. Unknown ids are ignored.
    pub fn unregister(&self, id: SessionId) {
        self.send(Command::Unregister(id));
    }

    /// Wrap `point` in a `data` envelope and fan it out.
    pub fn broadcast_data(&self, point: &CanonicalPoint) {
        self.broadcast(Envelope::Data(point));
    }

    /// Wrap `alert` in an `alert` envelope and fan it out.
    pub fn broadcast_alert(&self, alert: &Alert) {
        self.broadcast(Envelope::Alert(alert));
    }

    /// Remove every session and close its queue. Each session's writer
    /// then sends a close frame and the session ends.
    pub fn close_all(&self) {
        self.send(Command::CloseAll);
    }

    /// Number of registered sessions once every earlier command has been
    /// applied.
    pub async fn session_count(&self) -> usize {
        let (reply, count) = oneshot::channel();
        self.send(Command::Count(reply));
        count.await.unwrap_or(0)
    }

    pub fn downgrade(&self) -> WeakHub {
        WeakHub {
            commands: self.commands.downgrade(),
        }
    }

    fn broadcast(&self, envelope: Envelope<'_>) {
        match envelope.to_json() {
            Ok(json) => self.send(Command::Broadcast(Utf8Bytes::from(json))),
            Err(e) => {
                tracing::error!(error = %e, kind = envelope.kind(), "Failed to serialize envelope");
            }
        }
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::debug!("Hub control loop has stopped, command dropped");
        }
    }
}

impl WeakHub {
    /// Get a strong handle if the hub is still running.
    pub fn upgrade(&self) -> Option<Hub> {
        self.commands.upgrade().map(|commands| Hub { commands })
    }

    pub fn unregister(&self, id: SessionId) {
        if let Some(hub) = self.upgrade() {
            hub.unregister(id);
        }
    }
}

impl AlertSink for Hub {
    fn name(&self) -> &str {
        "live-feed"
    }

    fn deliver(&self, alert: &Alert) {
        self.broadcast_alert(alert);
    }
}

async fn run(mut inbox: mpsc::UnboundedReceiver<Command>) {
    let mut sessions: HashMap<SessionId, SessionQueue> = HashMap::new();
    tracing::info!("Broadcast hub started");

    while let Some(command) = inbox.recv().await {
        match command {
            Command::Register { id, queue } => {
                sessions.insert(id, queue);
                tracing::info!(session_id = %id, sessions = sessions.len(), "Session registered");
            }
            Command::Unregister(id) => {
                if sessions.remove(&id).is_some() {
                    tracing::info!(session_id = %id, sessions = sessions.len(), "Session unregistered");
                }
            }
            Command::Broadcast(message) => fan_out(&mut sessions, &message),
            Command::CloseAll => {
                tracing::info!(sessions = sessions.len(), "Closing all sessions");
                sessions.clear();
            }
            Command::Count(reply) => {
                let _ = reply.send(sessions.len());
            }
        }
    }

    tracing::info!(sessions = sessions.len(), "Broadcast hub stopped");
}

/// Offer `message` to every session without waiting. Sessions whose queue
/// is full or closed are removed, which drops their queue sender.
fn fan_out(sessions: &mut HashMap<SessionId, SessionQueue>, message: &Utf8Bytes) {
    sessions.retain(|id, queue| match queue.try_send(message.clone()) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::warn!(session_id = %id, "Session queue full, evicting slow observer");
            false
        }
        Err(TrySendError::Closed(_)) => {
            tracing::debug!(session_id = %id, "Session queue closed, removing");
            false
        }
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dropping_last_strong_handle_invalidates_weak_handles() {
        let hub = Hub::spawn();
        let weak = hub.downgrade();
        assert!(weak.upgrade().is_some());

        drop(hub);

        assert!(weak.upgrade().is_none());
        // Calls through a dangling handle are silently ignored.
        weak.unregister(Uuid::new_v4());
    }

    #[tokio::test]
    async fn fan_out_keeps_sessions_with_room() {
        let mut sessions = HashMap::new();
        let (queue, mut rx) = mpsc::channel(2);
        let id = Uuid::new_v4();
        sessions.insert(id, queue);

        fan_out(&mut sessions, &Utf8Bytes::from_static("one"));
        fan_out(&mut sessions, &Utf8Bytes::from_static("two"));

        assert!(sessions.contains_key(&id));
        assert_eq!(rx.recv().await.unwrap().as_str(), "one");
        assert_eq!(rx.recv().await.unwrap().as_str(), "two");
    }

    #[tokio::test]
    async fn fan_out_evicts_full_and_closed_queues() {
        let mut sessions = HashMap::new();

        let (full, _full_rx) = mpsc::channel(1);
        full.try_send(Utf8Bytes::from_static("pending")).unwrap();
        let full_id = Uuid::new_v4();
        sessions.insert(full_id, full);

        let (closed, closed_rx) = mpsc::channel(1);
        drop(closed_rx);
        let closed_id = Uuid::new_v4();
        sessions.insert(closed_id, closed);

        fan_out(&mut sessions, &Utf8Bytes::from_static("next"));

        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn hub_is_an_alert_sink() {
        let hub = Hub::spawn();
        let sink: &dyn AlertSink = &hub;
        assert_eq!(sink.name(), "live-feed");
    }
}
