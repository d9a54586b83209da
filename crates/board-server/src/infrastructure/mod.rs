//! Infrastructure layer for board-server.
//!
//! The infrastructure layer handles all I/O: accepting WebSocket connections
//! from browsers, writing frames back to them, and reading the config file.
//!
//! # Responsibilities
//!
//! - Binding a TCP listener for browser WebSocket connections
//! - Performing the WebSocket HTTP upgrade handshake (path check included)
//! - Implementing [`crate::application::Connection`] over a per-session
//!   writer task
//! - Translating WebSocket frames into lifecycle events
//! - Handling the graceful shutdown signal
//! - Loading the optional TOML config file
//!
//! # What does NOT belong here?
//!
//! - History and broadcast rules (that is the application layer)
//! - Wire payload definitions (that is the domain layer)
//! - CLI parsing (that is done in `main.rs`)

pub mod config_file;
pub mod ws_connection;
pub mod ws_server;

pub use config_file::{load_config, ConfigError};
pub use ws_connection::{OutboundQueue, WsConnection};
pub use ws_server::{run_server, BoardServer};
