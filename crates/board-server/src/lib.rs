//! board-server library crate.
//!
//! A real-time collaborative drawing board.  Every text message a client
//! sends is treated as a drawing event and fanned out to every connected
//! client, while a replayable history lets late joiners see the current
//! state of the board.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Browser (text frames over WebSocket)
//!         ↕
//! [board-server]
//!   ├── domain/           Pure types: wire payloads, ConnectionId, BoardConfig
//!   ├── application/      Registry, history, broadcast engine, lifecycle
//!   └── infrastructure/
//!         ├── ws_server/    WebSocket accept loop (tokio-tungstenite)
//!         ├── ws_connection/ Channel-backed Connection implementation
//!         └── config_file/  TOML config loading
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O, no async, no frameworks.
//! - `application` depends on `domain` only; the transport is reached
//!   through the [`application::Connection`] trait.
//! - `infrastructure` depends on all other layers plus `tokio` and
//!   `tungstenite`.
//!
//! # Shared state
//!
//! The connection registry and the history log are owned by one
//! [`application::BroadcastEngine`] built at startup and handed to every
//! connection handler behind an `Arc`.  There are no global singletons.

/// Domain layer: pure types (no I/O).
pub mod domain;

/// Application layer: shared board state and connection lifecycle.
pub mod application;

/// Infrastructure layer: WebSocket server and config file loading.
pub mod infrastructure;
