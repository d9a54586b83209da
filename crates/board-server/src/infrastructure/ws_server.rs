//! WebSocket server: accept loop and per-session task management.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Accepting incoming TCP connections from browsers.
//! 3. Upgrading each connection to a WebSocket session, but only on the
//!    configured board path.
//! 4. Running each session: a writer task drains the connection's outbound
//!    queue while the session task reads frames and feeds lifecycle events
//!    into a [`ConnectionHandler`].
//! 5. Gracefully shutting down when the `running` flag is cleared.
//!
//! # Shared state
//!
//! [`BoardServer`] builds exactly one [`BroadcastEngine`] and hands an
//! `Arc` of it to every session task.  Every session therefore broadcasts to,
//! and replays from, the same board.
//!
//! # Scalability
//!
//! Each browser session runs in its own Tokio task, and the accept loop never
//! waits on a session: it spawns and goes straight back to `accept()`.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{Stream, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::{
        handshake::server::{ErrorResponse, Request, Response},
        http::StatusCode,
        Error as WsError, Message as WsMessage,
    },
};
use tracing::{debug, error, info, warn};

use crate::application::{BroadcastEngine, ConnectionEvent, ConnectionHandler};
use crate::domain::{BoardConfig, ConnectionId};
use crate::infrastructure::ws_connection::{write_outbound, WsConnection};

/// How often the accept loop re-checks the shutdown flag when idle.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// How long a finished session waits for its writer to flush queued frames
/// (including the close reply) before aborting it.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

// ── Public API ────────────────────────────────────────────────────────────────

/// A bound board server that has not started accepting yet.
///
/// Binding and running are separate steps so callers (tests in particular)
/// can bind to port 0 and read the real address before connecting.
///
/// # Example
///
/// ```no_run
/// use std::sync::{atomic::AtomicBool, Arc};
/// use board_server::domain::BoardConfig;
/// use board_server::infrastructure::BoardServer;
///
/// # async fn example() -> anyhow::Result<()> {
/// let server = BoardServer::bind(BoardConfig::default()).await?;
/// println!("listening on {}", server.local_addr()?);
/// server.run(Arc::new(AtomicBool::new(true))).await?;
/// # Ok(())
/// # }
/// ```
pub struct BoardServer {
    listener: TcpListener,
    config: Arc<BoardConfig>,
    engine: Arc<BroadcastEngine>,
}

impl BoardServer {
    /// Binds the WebSocket listener and creates the board state.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot be bound (e.g., the port
    /// is already in use or the process lacks permission to bind).
    pub async fn bind(config: BoardConfig) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(config.ws_bind_addr)
            .await
            .with_context(|| {
                format!(
                    "failed to bind WebSocket listener on {}",
                    config.ws_bind_addr
                )
            })?;

        Ok(Self {
            listener,
            config: Arc::new(config),
            engine: Arc::new(BroadcastEngine::new()),
        })
    }

    /// The address the listener is actually bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// A shared handle on the board state, for inspection.
    pub fn engine(&self) -> Arc<BroadcastEngine> {
        Arc::clone(&self.engine)
    }

    /// Accepts connections until `running` is set to `false`.
    ///
    /// # Errors
    ///
    /// Currently infallible once bound; accept errors are logged and the
    /// loop continues.
    pub async fn run(self, running: Arc<AtomicBool>) -> anyhow::Result<()> {
        let BoardServer {
            listener,
            config,
            engine,
        } = self;

        match listener.local_addr() {
            Ok(addr) => info!("board server listening on ws://{addr}{}", config.ws_path),
            Err(e) => warn!("board server listening (address unavailable: {e})"),
        }

        loop {
            if !running.load(Ordering::Relaxed) {
                info!("shutdown flag set; stopping accept loop");
                break;
            }

            // A short timeout on `accept()` lets the loop notice the shutdown
            // flag even when nobody is connecting.
            match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
                Ok(Ok((stream, peer_addr))) => {
                    debug!("new TCP connection from {peer_addr}");
                    let config = Arc::clone(&config);
                    let engine = Arc::clone(&engine);
                    tokio::spawn(async move {
                        handle_session(stream, peer_addr, config, engine).await;
                    });
                }
                Ok(Err(e)) => {
                    // Transient accept error (e.g., too many open file descriptors).
                    error!("accept error: {e}");
                }
                Err(_) => {
                    // No new connection in the last poll interval.
                }
            }
        }

        Ok(())
    }
}

/// Binds and runs a board server until `running` is set to `false`.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound.
pub async fn run_server(config: BoardConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    BoardServer::bind(config).await?.run(running).await
}

// ── Per-session handler ───────────────────────────────────────────────────────

/// Entry point of each per-session task; logs the outcome of [`run_session`].
async fn handle_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<BoardConfig>,
    engine: Arc<BroadcastEngine>,
) {
    match run_session(raw_stream, peer_addr, config, engine).await {
        Ok(()) => debug!("session {peer_addr} finished"),
        Err(e) => warn!("session {peer_addr} ended with error: {e:#}"),
    }
}

/// Runs the complete lifecycle of a single browser WebSocket session.
///
/// # Errors
///
/// Returns an error if the WebSocket handshake fails or is rejected.  Once
/// the handshake succeeds, transport errors are reported to the connection
/// handler instead of being returned.
async fn run_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<BoardConfig>,
    engine: Arc<BroadcastEngine>,
) -> anyhow::Result<()> {
    // ── Handshake (CONNECTING) ────────────────────────────────────────────────
    let ws_stream = accept_hdr_async(raw_stream, |request: &Request, response: Response| {
        check_upgrade_path(&config, request, response)
    })
    .await
    .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let id = ConnectionId::new();
    info!("WebSocket session established: {peer_addr} as connection {id}");

    let (ws_tx, ws_rx) = ws_stream.split();
    let (connection, outbound) = WsConnection::new(id);
    let mut writer = tokio::spawn(write_outbound(ws_tx, outbound, id));

    // ── OPEN ──────────────────────────────────────────────────────────────────
    let mut handler = ConnectionHandler::new(Arc::new(connection), engine);
    handler.handle(ConnectionEvent::Opened);

    let writer_finished = drive_session(&mut handler, ws_rx, &mut writer).await;

    // ── CLOSED ────────────────────────────────────────────────────────────────
    // Dropping the handler releases the last sender, so the writer drains
    // what is queued and closes the sink.
    drop(handler);
    if !writer_finished && timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        debug!("connection {id}: writer did not drain in time; aborting");
        writer.abort();
    }

    Ok(())
}

/// Feeds lifecycle events into `handler` until the connection closes.
///
/// Inbound frames become open-state events.  If the writer task ends first,
/// a clean end is reported as a close and a failed write as an error, so the
/// connection leaves the registry even while its read side is still open.
///
/// Returns `true` if the session ended because the writer finished.
async fn drive_session<R>(
    handler: &mut ConnectionHandler,
    mut inbound: R,
    writer: &mut JoinHandle<Result<(), WsError>>,
) -> bool
where
    R: Stream<Item = Result<WsMessage, WsError>> + Unpin,
{
    let id = handler.id();
    loop {
        tokio::select! {
            frame = inbound.next() => {
                if let Some(event) = inbound_event(frame, id) {
                    if handler.handle(event).is_closed() {
                        return false;
                    }
                }
            }
            result = &mut *writer => {
                let event = match result {
                    Ok(Ok(())) => ConnectionEvent::Closed,
                    Ok(Err(e)) => ConnectionEvent::Error(format!("write failed: {e}")),
                    Err(e) => ConnectionEvent::Error(format!("writer task failed: {e}")),
                };
                handler.handle(event);
                return true;
            }
        }
    }
}

/// Handshake callback: accepts the upgrade only on the configured path.
fn check_upgrade_path(
    config: &BoardConfig,
    request: &Request,
    response: Response,
) -> Result<Response, ErrorResponse> {
    let path = request.uri().path();
    if config.accepts_path(path) {
        return Ok(response);
    }

    warn!("rejecting WebSocket upgrade for unknown path {path}");
    let mut rejection = ErrorResponse::new(Some(format!("no board at {path}")));
    *rejection.status_mut() = StatusCode::NOT_FOUND;
    Err(rejection)
}

/// Maps one item from the WebSocket read stream to a lifecycle event.
///
/// Returns `None` for frames the board does not act on (ping, pong, raw
/// frames, non-UTF-8 binary).
fn inbound_event(
    frame: Option<Result<WsMessage, WsError>>,
    id: ConnectionId,
) -> Option<ConnectionEvent> {
    match frame {
        None => Some(ConnectionEvent::Closed),
        Some(Ok(WsMessage::Text(text))) => Some(ConnectionEvent::Message(text)),
        Some(Ok(WsMessage::Binary(bytes))) => match String::from_utf8(bytes) {
            Ok(text) => Some(ConnectionEvent::Message(text)),
            Err(_) => {
                warn!("connection {id}: non-UTF-8 binary frame ignored");
                None
            }
        },
        Some(Ok(WsMessage::Close(frame))) => {
            debug!("connection {id}: close frame received: {frame:?}");
            Some(ConnectionEvent::Closed)
        }
        // tungstenite answers pings itself.
        Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_))) => None,
        Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
            Some(ConnectionEvent::Closed)
        }
        Some(Err(e)) => Some(ConnectionEvent::Error(e.to_string())),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::mock::RecordingConnection;
    use crate::application::Connection;
    use crate::infrastructure::ws_connection::OutboundQueue;
    use futures_util::stream;
    use tokio::io::duplex;
    use tokio_tungstenite::{tungstenite::protocol::Role, WebSocketStream};

    fn request_for(uri: &str) -> Request {
        Request::builder().uri(uri).body(()).unwrap()
    }

    #[test]
    fn test_check_upgrade_path_accepts_board_path() {
        let config = BoardConfig::default();
        let result = check_upgrade_path(&config, &request_for("/board"), Response::new(()));
        assert!(result.is_ok());
    }

    #[test]
    fn test_check_upgrade_path_accepts_query_string() {
        let config = BoardConfig::default();
        let result = check_upgrade_path(
            &config,
            &request_for("/board?user=abc"),
            Response::new(()),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_check_upgrade_path_rejects_other_path_with_404() {
        // Arrange
        let config = BoardConfig::default();

        // Act
        let result = check_upgrade_path(&config, &request_for("/chat"), Response::new(()));

        // Assert
        let rejection = result.unwrap_err();
        assert_eq!(rejection.status(), StatusCode::NOT_FOUND);
        assert_eq!(rejection.body().as_deref(), Some("no board at /chat"));
    }

    #[test]
    fn test_inbound_text_is_message() {
        let event = inbound_event(
            Some(Ok(WsMessage::Text(r#"{"x":1}"#.to_string()))),
            ConnectionId::new(),
        );
        assert_eq!(event, Some(ConnectionEvent::Message(r#"{"x":1}"#.to_string())));
    }

    #[test]
    fn test_inbound_utf8_binary_is_message() {
        let event = inbound_event(
            Some(Ok(WsMessage::Binary(b"CLEAR".to_vec()))),
            ConnectionId::new(),
        );
        assert_eq!(event, Some(ConnectionEvent::Message("CLEAR".to_string())));
    }

    #[test]
    fn test_inbound_invalid_binary_is_ignored() {
        let event = inbound_event(
            Some(Ok(WsMessage::Binary(vec![0xff, 0xfe]))),
            ConnectionId::new(),
        );
        assert_eq!(event, None);
    }

    #[test]
    fn test_inbound_ping_and_pong_are_ignored() {
        let id = ConnectionId::new();
        assert_eq!(inbound_event(Some(Ok(WsMessage::Ping(vec![1]))), id), None);
        assert_eq!(inbound_event(Some(Ok(WsMessage::Pong(vec![1]))), id), None);
    }

    #[test]
    fn test_inbound_close_frame_and_end_of_stream_are_closed() {
        let id = ConnectionId::new();
        assert_eq!(
            inbound_event(Some(Ok(WsMessage::Close(None))), id),
            Some(ConnectionEvent::Closed)
        );
        assert_eq!(inbound_event(None, id), Some(ConnectionEvent::Closed));
    }

    #[test]
    fn test_inbound_connection_closed_error_is_closed() {
        let event = inbound_event(Some(Err(WsError::ConnectionClosed)), ConnectionId::new());
        assert_eq!(event, Some(ConnectionEvent::Closed));
    }

    #[test]
    fn test_inbound_io_error_is_error() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let event = inbound_event(Some(Err(WsError::Io(io))), ConnectionId::new());
        assert!(matches!(event, Some(ConnectionEvent::Error(cause)) if cause.contains("reset by peer")));
    }

    #[tokio::test]
    async fn test_bind_port_zero_reports_real_port() {
        let config = BoardConfig {
            ws_bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..BoardConfig::default()
        };

        let server = BoardServer::bind(config).await.unwrap();

        assert_ne!(server.local_addr().unwrap().port(), 0);
        assert_eq!(server.engine().connection_count(), 0);
    }

    #[tokio::test]
    async fn test_run_returns_when_flag_cleared() {
        let config = BoardConfig {
            ws_bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..BoardConfig::default()
        };
        let server = BoardServer::bind(config).await.unwrap();
        let running = Arc::new(AtomicBool::new(false));

        let result = timeout(Duration::from_secs(2), server.run(running)).await;

        assert!(matches!(result, Ok(Ok(()))));
    }

    // ── Session driving ───────────────────────────────────────────────────────

    /// Opens a handler for a new WebSocket connection on `engine`.
    fn open_session(engine: &Arc<BroadcastEngine>) -> (ConnectionHandler, ConnectionId, OutboundQueue) {
        let id = ConnectionId::new();
        let (connection, outbound) = WsConnection::new(id);
        let mut handler = ConnectionHandler::new(Arc::new(connection), Arc::clone(engine));
        handler.handle(ConnectionEvent::Opened);
        (handler, id, outbound)
    }

    #[tokio::test]
    async fn test_write_failure_deregisters_while_reader_stays_open() {
        // Arrange: a server socket whose peer is gone, next to a healthy
        // connection that must keep its place
        let engine = Arc::new(BroadcastEngine::new());
        let bystander = RecordingConnection::healthy();
        engine.join(bystander.clone());
        let (server_io, client_io) = duplex(1024);
        drop(client_io);
        let socket = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
        let (mut handler, id, outbound) = open_session(&engine);
        let mut writer = tokio::spawn(write_outbound(socket, outbound, id));
        assert_eq!(engine.connection_count(), 2);

        // Act: writing the queued greeting fails; the read side never yields
        let inbound = stream::pending::<Result<WsMessage, WsError>>();
        let writer_finished = timeout(
            Duration::from_secs(2),
            drive_session(&mut handler, inbound, &mut writer),
        )
        .await
        .expect("session ends when the writer fails");

        // Assert
        assert!(writer_finished);
        assert!(handler.state().is_closed());
        assert!(!engine.registry().contains(id));
        assert!(engine.registry().contains(bystander.id()));
        assert_eq!(engine.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_writer_finishing_cleanly_closes_session() {
        let engine = Arc::new(BroadcastEngine::new());
        let (mut handler, id, _outbound) = open_session(&engine);
        let mut writer = tokio::spawn(async { Ok::<(), WsError>(()) });

        let inbound = stream::pending::<Result<WsMessage, WsError>>();
        let writer_finished = drive_session(&mut handler, inbound, &mut writer).await;

        assert!(writer_finished);
        assert!(handler.state().is_closed());
        assert!(!engine.registry().contains(id));
    }

    #[tokio::test]
    async fn test_inbound_close_frame_ends_session_before_writer() {
        // Arrange: the writer would never finish on its own
        let engine = Arc::new(BroadcastEngine::new());
        let (mut handler, id, _outbound) = open_session(&engine);
        let mut writer = tokio::spawn(async {
            std::future::pending::<()>().await;
            Ok::<(), WsError>(())
        });
        let inbound = stream::iter(vec![
            Ok(WsMessage::Text("point".to_string())),
            Ok(WsMessage::Close(None)),
        ]);

        // Act
        let writer_finished = drive_session(&mut handler, inbound, &mut writer).await;

        // Assert
        assert!(!writer_finished);
        assert!(handler.state().is_closed());
        assert!(!engine.registry().contains(id));
        assert_eq!(engine.history().replay(), vec!["point"]);
        writer.abort();
    }
}
