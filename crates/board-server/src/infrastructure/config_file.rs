//! TOML configuration file loading.
//!
//! The file is optional; every field in it is optional too.  Missing fields
//! fall back to the [`BoardConfig`] defaults, so a file only needs to name
//! what it changes.  Example:
//!
//! ```toml
//! [server]
//! bind_address = "127.0.0.1"
//! port = 9000
//! path = "/board"
//! ```
//!
//! CLI arguments are applied on top of whatever this module returns (see
//! `main.rs`).

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::config::{BoardConfig, DEFAULT_WS_PATH, DEFAULT_WS_PORT};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The WebSocket path is not an absolute request path.
    #[error("invalid WebSocket path '{0}': must start with '/'")]
    InvalidPath(String),
}

/// On-disk layout of the config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    server: ServerSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerSection {
    #[serde(default = "default_bind_address")]
    bind_address: IpAddr,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_path")]
    path: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            path: default_path(),
        }
    }
}

fn default_bind_address() -> IpAddr {
    BoardConfig::default().ws_bind_addr.ip()
}

fn default_port() -> u16 {
    DEFAULT_WS_PORT
}

fn default_path() -> String {
    DEFAULT_WS_PATH.to_string()
}

/// Reads and parses the config file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read, and the errors of
/// [`parse_config`] otherwise.
pub fn load_config(path: &Path) -> Result<BoardConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text)
}

/// Parses TOML text into a [`BoardConfig`].
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys, and
/// [`ConfigError::InvalidPath`] if `path` does not start with `/`.
pub fn parse_config(text: &str) -> Result<BoardConfig, ConfigError> {
    let file: ConfigFile = toml::from_str(text)?;
    let server = file.server;
    validate_ws_path(&server.path)?;

    Ok(BoardConfig {
        ws_bind_addr: SocketAddr::new(server.bind_address, server.port),
        ws_path: server.path,
    })
}

/// Checks that `path` is usable as a WebSocket request path.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidPath`] if `path` does not start with `/`.
pub fn validate_ws_path(path: &str) -> Result<(), ConfigError> {
    if path.starts_with('/') {
        Ok(())
    } else {
        Err(ConfigError::InvalidPath(path.to_string()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
