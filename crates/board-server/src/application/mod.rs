//! Application layer for board-server.
//!
//! The application layer owns the shared board state and knows *what*
//! happens on each connection event, but delegates *how* payloads reach a
//! client to the infrastructure layer through the [`Connection`] trait.
//!
//! # Responsibilities
//!
//! - Tracking open connections ([`ConnectionRegistry`])
//! - Keeping the replayable history ([`HistoryLog`])
//! - Fanning events out and greeting new connections ([`BroadcastEngine`])
//! - Driving each connection's lifecycle ([`ConnectionHandler`])
//! - A recording [`Connection`] for tests ([`mock::RecordingConnection`])
//!
//! # What does NOT belong here?
//!
//! - Opening sockets or performing WebSocket handshakes
//! - Tokio task spawning
//! - WebSocket framing (handled by tokio-tungstenite)

pub mod broadcast;
pub mod connection;
pub mod history;
pub mod lifecycle;
pub mod mock;
pub mod registry;

pub use broadcast::BroadcastEngine;
pub use connection::{Connection, SendError};
pub use history::HistoryLog;
pub use lifecycle::{ConnectionEvent, ConnectionHandler};
pub use registry::ConnectionRegistry;
