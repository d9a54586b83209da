//! Recording connection for tests.
//!
//! Lets unit tests, integration tests, and benchmarks stand in for a browser
//! without opening a socket.  Payloads handed to a healthy connection are
//! kept in order; a broken connection rejects every payload with
//! [`SendError::Closed`], as a WebSocket link whose writer has exited would.

use std::sync::{Arc, Mutex, PoisonError};

use super::{Connection, SendError};
use crate::domain::ConnectionId;

/// A [`Connection`] that records what it is sent.
#[derive(Debug)]
pub struct RecordingConnection {
    id: ConnectionId,
    received: Mutex<Vec<String>>,
    fail_sends: bool,
}

impl RecordingConnection {
    /// A connection that accepts every payload.
    pub fn healthy() -> Arc<Self> {
        Self::with_failure(false)
    }

    /// A connection whose every send fails.
    pub fn broken() -> Arc<Self> {
        Self::with_failure(true)
    }

    fn with_failure(fail_sends: bool) -> Arc<Self> {
        Arc::new(Self {
            id: ConnectionId::new(),
            received: Mutex::new(Vec::new()),
            fail_sends,
        })
    }

    /// Everything received so far, in delivery order.
    pub fn received(&self) -> Vec<String> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns and forgets everything received so far.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.received.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Connection for RecordingConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn send_text(&self, payload: &str) -> Result<(), SendError> {
        if self.fail_sends {
            return Err(SendError::Closed(self.id));
        }
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(payload.to_string());
        Ok(())
    }
}
