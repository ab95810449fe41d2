//! One live-feed session per WebSocket connection.
//!
//! A session is two concurrent halves: the write pump drains the session's
//! outbound queue into the socket and pings on a timer, the read pump
//! consumes inbound frames and enforces the liveness deadline. Whichever
//! half finishes first ends the session; the other is torn down and the
//! session is unregistered from the hub.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use futures::{Sink, SinkExt, Stream, StreamExt};
use iotgw_core::HistoryBuffer;
use iotgw_events::Envelope;
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, timeout_at, Instant};
use uuid::Uuid;

use super::hub::{SessionId, SessionQueue, WeakHub, SESSION_QUEUE_CAPACITY};
use super::keepalive::KeepaliveConfig;

/// Why a session half stopped.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("write did not complete within the write deadline")]
    WriteTimeout,

    #[error("no pong received within the read deadline")]
    ReadTimeout,

    #[error("websocket transport error: {0}")]
    Transport(#[from] axum::Error),
}

/// Drive a session from accept to teardown.
///
/// Queues the history snapshot on a fresh queue, registers that queue with
/// the hub, then runs both pumps until either one stops.
pub async fn run_session(
    socket: WebSocket,
    hub: WeakHub,
    history: Arc<HistoryBuffer>,
    keepalive: KeepaliveConfig,
) {
    let session_id = Uuid::new_v4();

    let Some(strong) = hub.upgrade() else {
        tracing::warn!(session_id = %session_id, "Hub is not running, dropping connection");
        return;
    };
    let (queue, outbound) = mpsc::channel(SESSION_QUEUE_CAPACITY);
    // History goes in before the hub can see the queue, so no broadcast
    // can overtake it.
    queue_history(&queue, &history, session_id);
    strong.register(session_id, queue);
    drop(strong);
    tracing::info!(session_id = %session_id, "Live feed session opened");

    let (sink, stream) = socket.split();
    let mut writer = tokio::spawn(write_pump(sink, outbound, keepalive));

    let outcome = tokio::select! {
        result = read_pump(stream, session_id, keepalive.pong_wait) => result,
        joined = &mut writer => match joined {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "Write pump task failed");
                Ok(())
            }
        },
    };

    match outcome {
        Ok(()) => tracing::info!(session_id = %session_id, "Live feed session closed"),
        Err(e) => tracing::info!(session_id = %session_id, reason = %e, "Live feed session ended"),
    }

    hub.unregister(session_id);
    writer.abort();
}

/// Put the current history snapshot on an empty, unregistered queue.
///
/// Sent even when the buffer is empty so clients can treat the first
/// frame as their initial state.
fn queue_history(queue: &SessionQueue, history: &HistoryBuffer, session_id: SessionId) {
    let snapshot = history.get_all();
    let json = match Envelope::History(&snapshot).to_json() {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(session_id = %session_id, error = %e, "Failed to serialize history");
            return;
        }
    };

    match queue.try_send(Utf8Bytes::from(json)) {
        Ok(()) => tracing::debug!(session_id = %session_id, points = snapshot.len(), "History queued"),
        Err(e) => tracing::warn!(session_id = %session_id, error = %e, "Failed to queue history"),
    }
}

/// Forward queued messages to `sink` and ping every `ping_period`.
///
/// Messages already waiting behind the first one are written as a single
/// batch with one flush, each still its own text frame. Every write must
/// finish within `write_wait`. Returns `Ok(())` after sending a close
/// frame once the hub closes the queue.
pub async fn write_pump<S>(
    mut sink: S,
    mut queue: mpsc::Receiver<Utf8Bytes>,
    keepalive: KeepaliveConfig,
) -> Result<(), SessionError>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let period = keepalive.ping_period();
    let mut ticker = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            next = queue.recv() => {
                let Some(first) = next else {
                    let _ = timeout(keepalive.write_wait, sink.send(Message::Close(None))).await;
                    return Ok(());
                };
                timeout(keepalive.write_wait, write_batch(&mut sink, first, &mut queue))
                    .await
                    .map_err(|_| SessionError::WriteTimeout)??;
            }
            _ = ticker.tick() => {
                timeout(keepalive.write_wait, sink.send(Message::Ping(Bytes::new())))
                    .await
                    .map_err(|_| SessionError::WriteTimeout)??;
            }
        }
    }
}

async fn write_batch<S>(
    sink: &mut S,
    first: Utf8Bytes,
    queue: &mut mpsc::Receiver<Utf8Bytes>,
) -> Result<(), axum::Error>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    sink.feed(Message::Text(first)).await?;
    for _ in 1..SESSION_QUEUE_CAPACITY {
        match queue.try_recv() {
            Ok(next) => sink.feed(Message::Text(next)).await?,
            Err(_) => break,
        }
    }
    sink.flush().await
}

/// Consume inbound frames until the peer goes away.
///
/// The deadline starts at `pong_wait` and is pushed out only by control
/// frames. Text from observers carries no protocol meaning and is just
/// logged. Returns `Ok(())` on a close frame or end of stream.
pub async fn read_pump<St>(
    mut stream: St,
    session_id: SessionId,
    pong_wait: Duration,
) -> Result<(), SessionError>
where
    St: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let mut deadline = Instant::now() + pong_wait;

    loop {
        let frame = match timeout_at(deadline, stream.next()).await {
            Err(_) => return Err(SessionError::ReadTimeout),
            Ok(None) => return Ok(()),
            Ok(Some(frame)) => frame?,
        };

        match frame {
            Message::Pong(_) | Message::Ping(_) => {
                deadline = Instant::now() + pong_wait;
            }
            Message::Text(text) => {
                tracing::debug!(session_id = %session_id, message = %text.as_str(), "Observer sent text");
            }
            Message::Close(_) => return Ok(()),
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
