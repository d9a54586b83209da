//! WebSocket-backed implementation of the [`Connection`] trait.
//!
//! Each session splits its WebSocket into a read stream and a write sink.
//! The sink is moved into a dedicated writer task that drains an unbounded
//! channel.  [`WsConnection`] holds the sending end of that channel:
//!
//! ```text
//! BroadcastEngine ──send_text──▶ [mpsc queue] ──writer task──▶ WebSocket sink
//! ```
//!
//! `send_text` therefore never waits on the network.  A slow browser only
//! grows its own queue; it never delays delivery to other browsers.  Once the
//! writer task has exited (socket write failed, or the session ended), the
//! receiving end is gone and `send_text` returns [`SendError::Closed`].
//!
//! The queue has no bound.  Its depth is tracked so that a browser that
//! stops reading shows up in the logs: a warning is emitted each time the
//! backlog reaches another multiple of [`QUEUE_WARN_THRESHOLD`].

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use futures_util::{Sink, SinkExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tracing::{debug, warn};

use crate::application::{Connection, SendError};
use crate::domain::ConnectionId;

/// Queue depth at which (and at every multiple of which) a backlog warning
/// is logged.
pub const QUEUE_WARN_THRESHOLD: usize = 1024;

/// Send capability for one WebSocket client.
#[derive(Debug, Clone)]
pub struct WsConnection {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<String>,
    depth: Arc<AtomicUsize>,
}

/// The receiving end of a [`WsConnection`]'s queue, owned by the writer task.
#[derive(Debug)]
pub struct OutboundQueue {
    rx: mpsc::UnboundedReceiver<String>,
    depth: Arc<AtomicUsize>,
}

impl WsConnection {
    /// Creates a connection handle and the queue its writer task must drain.
    pub fn new(id: ConnectionId) -> (Self, OutboundQueue) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let depth = Arc::new(AtomicUsize::new(0));
        let queue = OutboundQueue {
            rx,
            depth: Arc::clone(&depth),
        };
        (Self { id, outbound, depth }, queue)
    }
}

impl Connection for WsConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn send_text(&self, payload: &str) -> Result<(), SendError> {
        let depth = self.depth.fetch_add(1, Ordering::Relaxed) + 1;
        if self.outbound.send(payload.to_string()).is_err() {
            self.depth.fetch_sub(1, Ordering::Relaxed);
            return Err(SendError::Closed(self.id));
        }
        if is_backlog_warning(depth) {
            warn!(
                "connection {}: {depth} payloads queued; client is not keeping up",
                self.id
            );
        }
        Ok(())
    }
}

impl OutboundQueue {
    /// Waits for the next queued payload; `None` once every sender is gone.
    async fn recv(&mut self) -> Option<String> {
        let payload = self.rx.recv().await?;
        self.depth.fetch_sub(1, Ordering::Relaxed);
        Some(payload)
    }

    /// Number of payloads queued and not yet taken by the writer.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }
}

fn is_backlog_warning(depth: usize) -> bool {
    depth > 0 && depth % QUEUE_WARN_THRESHOLD == 0
}

/// Writes queued payloads to the WebSocket as text frames, in queue order.
///
/// Returns `Ok(())` once every sender has been dropped and the sink has been
/// closed cleanly.
///
/// # Errors
///
/// Returns the first WebSocket write error.  The queue is dropped with it,
/// so later `send_text` calls on this connection fail.
pub async fn write_outbound<S>(
    mut sink: S,
    mut outbound: OutboundQueue,
    id: ConnectionId,
) -> Result<(), WsError>
where
    S: Sink<WsMessage, Error = WsError> + Unpin,
{
    while let Some(payload) = outbound.recv().await {
        sink.send(WsMessage::Text(payload)).await?;
    }

    debug!("connection {id}: outbound queue closed; closing sink");
    match sink.close().await {
        Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
        Err(e) => Err(e),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
