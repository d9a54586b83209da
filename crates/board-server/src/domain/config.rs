//! Board server configuration types.
//!
//! [`BoardConfig`] is the single source of truth for all runtime settings.
//! It is built from defaults, then overlaid with an optional TOML file and
//! finally with CLI arguments (see `main.rs`).
//!
//! Keeping configuration as a plain struct (no global state, no environment
//! variable reads inside the domain) makes the server easy to embed in
//! tests.  The infrastructure layer populates it.

use std::net::SocketAddr;

/// Default TCP port.  Matches the port existing board clients connect to.
pub const DEFAULT_WS_PORT: u16 = 8080;

/// Default WebSocket endpoint path.
pub const DEFAULT_WS_PATH: &str = "/board";

/// All runtime configuration for the board server.
///
/// # Example
///
/// ```rust
/// use board_server::domain::BoardConfig;
///
/// let cfg = BoardConfig::default();
/// assert_eq!(cfg.ws_bind_addr.port(), 8080);
/// assert_eq!(cfg.ws_path, "/board");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    /// The address and port the WebSocket server binds to.
    ///
    /// `0.0.0.0` accepts connections from any interface; use `127.0.0.1`
    /// to accept only local connections.
    pub ws_bind_addr: SocketAddr,

    /// The request path on which WebSocket upgrades are accepted.
    ///
    /// Upgrade requests for any other path are answered with 404 and never
    /// become board connections.
    pub ws_path: String,
}

impl Default for BoardConfig {
    /// | Field          | Default        |
    /// |----------------|----------------|
    /// | ws_bind_addr   | `0.0.0.0:8080` |
    /// | ws_path        | `/board`       |
    fn default() -> Self {
        Self {
            ws_bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_WS_PORT)),
            ws_path: DEFAULT_WS_PATH.to_string(),
        }
    }
}

impl BoardConfig {
    /// Returns `true` if an upgrade request for the URI path `path` should be
    /// accepted.  Matching is exact; callers pass the path without its query.
    pub fn accepts_path(&self, path: &str) -> bool {
        path == self.ws_path
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
