//! Collaborative board server — entry point.
//!
//! This binary accepts WebSocket connections from browsers on the board
//! path.  Every text message a browser sends is stored in the board history
//! and broadcast to all connected browsers; new browsers receive a greeting
//! followed by the full history.  Sending the literal `CLEAR` wipes the
//! board for everyone.
//!
//! # Usage
//!
//! ```text
//! board-server [OPTIONS]
//!
//! Options:
//!   --config  <PATH>   TOML config file (optional)
//!   --ws-bind <IP>     Bind address          [default: 0.0.0.0]
//!   --ws-port <PORT>   WebSocket port        [default: 8080]
//!   --ws-path <PATH>   WebSocket path        [default: /board]
//! ```
//!
//! # Precedence
//!
//! Built-in defaults, then the config file, then CLI arguments (or their
//! environment variables).
//!
//! | Variable         | Flag        |
//! |------------------|-------------|
//! | `BOARD_CONFIG`   | `--config`  |
//! | `BOARD_WS_BIND`  | `--ws-bind` |
//! | `BOARD_WS_PORT`  | `--ws-port` |
//! | `BOARD_WS_PATH`  | `--ws-path` |

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use board_server::domain::BoardConfig;
use board_server::infrastructure::config_file::validate_ws_path;
use board_server::infrastructure::{load_config, run_server};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Real-time collaborative drawing board server.
#[derive(Debug, Parser)]
#[command(
    name = "board-server",
    about = "WebSocket broadcast server for a collaborative drawing board",
    version
)]
struct Cli {
    /// TOML config file.  Values in it are overridden by the flags below.
    #[arg(long, env = "BOARD_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to bind the WebSocket server to.
    ///
    /// Use `0.0.0.0` for all interfaces or `127.0.0.1` for local only.
    #[arg(long, env = "BOARD_WS_BIND")]
    ws_bind: Option<String>,

    /// TCP port for the WebSocket server.
    #[arg(long, env = "BOARD_WS_PORT")]
    ws_port: Option<u16>,

    /// Request path on which WebSocket upgrades are accepted.
    #[arg(long, env = "BOARD_WS_PATH")]
    ws_path: Option<String>,
}

impl Cli {
    /// Builds the effective [`BoardConfig`]: defaults, then the config file,
    /// then CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded or an override
    /// value is invalid.
    fn into_board_config(self) -> anyhow::Result<BoardConfig> {
        let base = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("failed to load config file {}", path.display()))?,
            None => BoardConfig::default(),
        };
        self.apply_overrides(base)
    }

    /// Applies the flag values that were given on top of `config`.
    fn apply_overrides(self, mut config: BoardConfig) -> anyhow::Result<BoardConfig> {
        if let Some(bind) = self.ws_bind {
            let ip: IpAddr = bind
                .parse()
                .with_context(|| format!("invalid WebSocket bind address: '{bind}'"))?;
            config.ws_bind_addr.set_ip(ip);
        }

        if let Some(port) = self.ws_port {
            config.ws_bind_addr.set_port(port);
        }

        if let Some(path) = self.ws_path {
            validate_ws_path(&path)?;
            config.ws_path = path;
        }

        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `RUST_LOG` controls verbosity; fall back to `info`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_board_config()?;

    info!(
        "board server starting — ws={}, path={}",
        config.ws_bind_addr, config.ws_path
    );

    // Cleared by Ctrl+C; the accept loop polls it.
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C — initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, running).await?;

    info!("board server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(overrides: &[&str]) -> Cli {
        let mut args = vec!["board-server"];
        args.extend_from_slice(overrides);
        Cli::parse_from(args)
    }

    #[test]
    fn test_no_arguments_yield_defaults() {
        // Arrange: parse with no arguments (all defaults apply)
        let cli = Cli {
            config: None,
            ws_bind: None,
            ws_port: None,
            ws_path: None,
        };

        // Act
        let config = cli.into_board_config().unwrap();

        // Assert
        assert_eq!(config, BoardConfig::default());
    }

    #[test]
    fn test_ws_port_override() {
        let config = cli(&["--ws-port", "9999"]).into_board_config().unwrap();
        assert_eq!(config.ws_bind_addr.port(), 9999);
    }

    #[test]
    fn test_ws_bind_override() {
        let config = cli(&["--ws-bind", "127.0.0.1"]).into_board_config().unwrap();
        assert_eq!(config.ws_bind_addr.ip().to_string(), "127.0.0.1");
    }

    #[test]
    fn test_ws_path_override() {
        let config = cli(&["--ws-path", "/draw"]).into_board_config().unwrap();
        assert_eq!(config.ws_path, "/draw");
    }

    #[test]
    fn test_invalid_ws_bind_returns_error() {
        let result = cli(&["--ws-bind", "not.an.ip"]).into_board_config();
        assert!(result.is_err());
    }

    #[test]
    fn test_relative_ws_path_returns_error() {
        let result = cli(&["--ws-path", "board"]).into_board_config();
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_config_file_returns_error() {
        let result = cli(&["--config", "/definitely/not/here/board.toml"]).into_board_config();
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_apply_on_top_of_file_values() {
        // Arrange: a config as if loaded from a file
        let from_file = BoardConfig {
            ws_bind_addr: "10.0.0.5:7000".parse().unwrap(),
            ws_path: "/draw".to_string(),
        };

        // Act: only the port is overridden
        let config = cli(&["--ws-port", "7100"]).apply_overrides(from_file).unwrap();

        // Assert
        assert_eq!(config.ws_bind_addr.to_string(), "10.0.0.5:7100");
        assert_eq!(config.ws_path, "/draw");
    }
}
