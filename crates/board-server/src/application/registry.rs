//! ConnectionRegistry: the live set of broadcast targets.
//!
//! The registry maps [`ConnectionId`] to a shared handle on the connection's
//! send capability.  The transport layer still owns the socket itself and
//! its teardown; dropping a registry entry only drops one sender handle.
//!
//! # Concurrency
//!
//! One `std::sync::Mutex` guards the map.  No `.await` happens while it is
//! held, so a blocking mutex is the right tool even inside async tasks.
//!
//! | Operation      | Guarantee                                              |
//! |----------------|--------------------------------------------------------|
//! | `register`     | atomic insert                                          |
//! | `deregister`   | atomic remove; absent ids are a silent no-op           |
//! | `snapshot`     | copy-on-read; later changes never affect the copy      |
//!
//! Because [`ConnectionRegistry::snapshot`] returns an owned `Vec`, a
//! broadcast pass iterates without holding the lock.  A connection removed
//! mid-pass may still receive that one in-flight payload; a connection added
//! mid-pass may miss it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::application::connection::Connection;
use crate::domain::ConnectionId;

type ConnectionMap = HashMap<ConnectionId, Arc<dyn Connection>>;

/// Thread-safe set of currently open connections.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: Mutex<ConnectionMap>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection as a broadcast target.
    ///
    /// Callers register exactly once per successful handshake.  Registering
    /// the same id again replaces the previous handle; the set never holds
    /// duplicates.
    pub fn register(&self, connection: Arc<dyn Connection>) {
        let id = connection.id();
        if self.lock().insert(id, connection).is_some() {
            debug!("connection {id} registered twice; previous handle replaced");
        }
    }

    /// Removes a connection if present.
    ///
    /// Returns `true` if the connection was registered.  Removing an unknown
    /// or already-removed id is not an error.
    pub fn deregister(&self, id: ConnectionId) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Returns a point-in-time copy of all registered connections.
    pub fn snapshot(&self) -> Vec<Arc<dyn Connection>> {
        self.lock().values().cloned().collect()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.lock().contains_key(&id)
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the map half-updated
    // (every critical section is a single HashMap call), so poison is ignored.
    fn lock(&self) -> MutexGuard<'_, ConnectionMap> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
