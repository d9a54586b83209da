//! BroadcastEngine: the shared board state and the fan-out logic.
//!
//! The engine owns the [`ConnectionRegistry`] and the [`HistoryLog`].  One
//! instance is built at startup and shared (`Arc<BroadcastEngine>`) with every
//! connection handler.
//!
//! # Submit
//!
//! ```text
//! raw == "CLEAR" ?
//!    yes → history.clear(),  payload = {"type":"CLEAR"}
//!    no  → history.append(raw), payload = raw
//! for conn in registry.snapshot():
//!    conn.send_text(payload)   // failure: log, keep going
//! ```
//!
//! # Failure policy
//!
//! Delivery failures are isolated per connection and never escape `submit`.
//! A failed send is logged, but the connection is **not** deregistered here.
//! Deregistration happens only through the close/error lifecycle hooks, so a
//! half-dead link keeps getting (and failing) broadcasts until its transport
//! notices.
//!
//! # Ordering
//!
//! Submits and joins are serialised by a sequencing lock.  Every connection
//! therefore sees events in history order, and a joining connection receives
//! each event exactly once: either in its replay or as a live broadcast,
//! never both and never neither.  The registry and the history keep their own
//! independent locks underneath.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::application::connection::Connection;
use crate::application::history::HistoryLog;
use crate::application::registry::ConnectionRegistry;
use crate::domain::{ConnectionId, EventMessage, GREETING};

/// Shared board state plus the operations that mutate it.
#[derive(Default)]
pub struct BroadcastEngine {
    registry: ConnectionRegistry,
    history: HistoryLog,
    sequencer: Mutex<()>,
}

impl BroadcastEngine {
    /// Creates an engine with an empty registry and an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Number of currently registered connections.
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of DATA payloads currently in history.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Ingests one inbound event and fans the result out to every
    /// registered connection.
    ///
    /// Always completes.  Per-connection send failures are logged and do not
    /// stop delivery to the remaining connections.
    pub fn submit(&self, raw: &str) {
        let event = EventMessage::parse(raw);
        let _order = self.sequence();

        match &event {
            EventMessage::Clear => {
                self.history.clear();
                info!("history cleared");
            }
            EventMessage::Data(payload) => self.history.append(payload.as_str()),
        }

        let payload = event.outbound_payload();
        let targets = self.registry.snapshot();
        let mut failed = 0usize;
        for connection in &targets {
            if !deliver(connection.as_ref(), payload) {
                failed += 1;
            }
        }

        debug!(
            kind = event.kind(),
            targets = targets.len(),
            failed,
            "broadcast complete"
        );
    }

    /// Registers a newly opened connection, then sends it the greeting
    /// followed by every history entry in order.
    ///
    /// The greeting and the replay go to this connection only; neither
    /// touches history.  Send failures here are logged like broadcast
    /// failures and leave the connection registered.
    pub fn join(&self, connection: Arc<dyn Connection>) {
        let _order = self.sequence();

        self.registry.register(Arc::clone(&connection));

        if !deliver(connection.as_ref(), GREETING) {
            return;
        }

        let replay = self.history.replay();
        let replayed = replay.len();
        for payload in &replay {
            if !deliver(connection.as_ref(), payload) {
                // The link is gone; the rest would fail the same way.
                return;
            }
        }

        debug!("connection {}: replayed {replayed} history entries", connection.id());
    }

    /// Removes a connection from the broadcast set.  Unknown ids are a no-op.
    ///
    /// Returns `true` if the connection was registered.
    pub fn leave(&self, id: ConnectionId) -> bool {
        self.registry.deregister(id)
    }

    fn sequence(&self) -> MutexGuard<'_, ()> {
        self.sequencer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Sends one payload to one connection, logging the outcome.
///
/// Returns `true` on success.
fn deliver(connection: &dyn Connection, payload: &str) -> bool {
    match connection.send_text(payload) {
        Ok(()) => {
            debug!("delivered to connection {}: {payload}", connection.id());
            true
        }
        Err(e) => {
            warn!("error delivering to connection {}: {e}", connection.id());
            false
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
