//! The transport seam: what the board needs from a client link.

use thiserror::Error;

use crate::domain::ConnectionId;

/// Errors returned when a payload cannot be handed to a connection.
///
/// A send failure is evidence that the link is dead, but the broadcast
/// engine only logs it.  The connection stays registered until the
/// transport reports close or error through the lifecycle hooks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The connection's outbound side has shut down.
    #[error("connection {0} is closed")]
    Closed(ConnectionId),
}

/// One live client link, as seen by the board.
///
/// Infrastructure implements this on top of a WebSocket writer task; tests
/// use [`super::mock::RecordingConnection`] or the mockall-generated
/// `MockConnection`.
///
/// # Contract for implementors
///
/// `send_text` is called while the broadcast engine holds its sequencing
/// lock, so it must not block on the network.  Queue the payload and return.
/// Payloads handed to one connection must be delivered in call order.
#[cfg_attr(test, mockall::automock)]
pub trait Connection: Send + Sync {
    /// The transport-assigned identifier of this link.
    fn id(&self) -> ConnectionId;

    /// Queues a text payload for delivery to this client.
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] if the link can no longer accept payloads.
    fn send_text(&self, payload: &str) -> Result<(), SendError>;
}
