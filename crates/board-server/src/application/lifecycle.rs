//! ConnectionHandler: the per-connection lifecycle state machine.
//!
//! The transport layer creates one handler per accepted socket and pushes
//! lifecycle events into it.  The handler turns those events into calls on
//! the shared [`BroadcastEngine`].
//!
//! ```text
//!                 Opened
//!  CONNECTING ─────────────▶ OPEN ──┐ Message(raw) → engine.submit(raw)
//!      │                      │  ◀──┘
//!      │ Closed / Error       │ Closed / Error → engine.leave(id)
//!      ▼                      ▼
//!   CLOSED ◀──────────────────┘
//! ```
//!
//! Handlers for different connections run on different tasks with no
//! assumption about which thread calls which hook.  All shared state lives
//! in the engine, so the handler itself needs no locking.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::broadcast::BroadcastEngine;
use crate::application::connection::Connection;
use crate::domain::{ConnectionId, ConnectionState};

/// A lifecycle notification from the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The handshake completed.
    Opened,
    /// A text payload arrived from the client.
    Message(String),
    /// The client closed the link (or the stream ended).
    Closed,
    /// The transport reported an error; the link is unusable.
    Error(String),
}

/// Drives one connection through `CONNECTING → OPEN → CLOSED`.
pub struct ConnectionHandler {
    connection: Arc<dyn Connection>,
    engine: Arc<BroadcastEngine>,
    state: ConnectionState,
}

impl ConnectionHandler {
    /// Creates a handler in the `CONNECTING` state.
    pub fn new(connection: Arc<dyn Connection>, engine: Arc<BroadcastEngine>) -> Self {
        Self {
            connection,
            engine,
            state: ConnectionState::Connecting,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.connection.id()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Dispatches one event and returns the resulting state.
    pub fn handle(&mut self, event: ConnectionEvent) -> ConnectionState {
        match event {
            ConnectionEvent::Opened => self.on_open(),
            ConnectionEvent::Message(raw) => self.on_message(&raw),
            ConnectionEvent::Closed => self.on_close(),
            ConnectionEvent::Error(cause) => self.on_error(cause),
        }
        self.state
    }

    /// Registers the connection, greets it and replays history to it.
    ///
    /// Only valid from `CONNECTING`; repeated or late calls are ignored.
    pub fn on_open(&mut self) {
        if self.state != ConnectionState::Connecting {
            warn!(
                "connection {}: open ignored in state {}",
                self.id(),
                self.state
            );
            return;
        }

        self.engine.join(Arc::clone(&self.connection));
        self.state = ConnectionState::Open;

        info!(
            "connection opened: {}, current connections: {}",
            self.id(),
            self.engine.connection_count()
        );
    }

    /// Forwards an inbound payload to the broadcast engine.
    ///
    /// Payloads arriving outside `OPEN` are dropped.
    pub fn on_message(&mut self, raw: &str) {
        if !self.state.is_open() {
            warn!(
                "connection {}: message dropped in state {}",
                self.id(),
                self.state
            );
            return;
        }

        debug!("message received from {}: {raw}", self.id());
        self.engine.submit(raw);
    }

    /// Deregisters the connection.  Safe to call in any state, any number of
    /// times.
    pub fn on_close(&mut self) {
        self.engine.leave(self.id());
        if self.state.is_closed() {
            return;
        }
        self.state = ConnectionState::Closed;

        info!(
            "connection closed: {}, current connections: {}",
            self.id(),
            self.engine.connection_count()
        );
    }

    /// Deregisters the connection after a transport error.  Identical to
    /// [`on_close`](Self::on_close) for registry purposes.
    pub fn on_error(&mut self, cause: impl fmt::Display) {
        self.engine.leave(self.id());
        if self.state.is_closed() {
            debug!("connection {}: error after close: {cause}", self.id());
            return;
        }
        self.state = ConnectionState::Closed;

        warn!("connection error on {}: {cause}", self.id());
    }
}

impl Drop for ConnectionHandler {
    // A session task that ends without reporting close/error (panic,
    // cancellation) still leaves the registry.
    fn drop(&mut self) {
        if !self.state.is_closed() {
            self.engine.leave(self.id());
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
