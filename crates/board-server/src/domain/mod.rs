//! Domain layer for board-server.
//!
//! The domain layer contains pure types that have no dependencies on I/O,
//! networking, or async runtimes.
//!
//! # What belongs in the domain layer?
//!
//! - The wire-level payloads (greeting, clear notification, control token)
//! - Classification of inbound events
//! - Connection identity and lifecycle state
//! - Configuration structures
//!
//! # What does NOT belong here?
//!
//! - Any `tokio`, `TcpStream`, or `WebSocket` types
//! - File I/O or environment variable reading

pub mod config;
pub mod connection;
pub mod messages;

pub use config::BoardConfig;
pub use connection::{ConnectionId, ConnectionState};
pub use messages::{EventMessage, CLEAR_NOTIFICATION, CLEAR_TOKEN, GREETING};
