//! Connection identity and lifecycle state.

use std::fmt;

use uuid::Uuid;

/// Opaque unique identifier for one client link.
///
/// Assigned by the transport layer when a socket is accepted.  Two
/// connections never share an id, so the registry can key on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generates a fresh random (v4) identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Per-connection lifecycle state.
///
/// ```text
/// CONNECTING ──opened──▶ OPEN ──closed / error──▶ CLOSED
///      │                                            ▲
///      └──────────────closed / error────────────────┘
/// ```
///
/// `Connecting` is transient and owned by the transport layer: it covers the
/// window between accepting the socket and completing the WebSocket
/// handshake.  `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    pub fn is_open(self) -> bool {
        self == ConnectionState::Open
    }

    pub fn is_closed(self) -> bool {
        self == ConnectionState::Closed
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Open => "OPEN",
            ConnectionState::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}
