//! HistoryLog: the ordered record of DATA payloads since the last clear.
//!
//! New connections receive the full log in order right after the greeting,
//! so a late joiner sees everything drawn since the board was last cleared.
//!
//! The log lives for the process lifetime.  It is never persisted and never
//! holds the control token, only DATA payloads.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Thread-safe, append-only (until cleared) log of broadcast payloads.
///
/// Each operation takes the internal lock once, so concurrent `append` and
/// `clear` calls never lose updates.  The relative order of two racing
/// appends is whichever takes the lock first.
#[derive(Debug, Default)]
pub struct HistoryLog {
    entries: Mutex<Vec<String>>,
}

impl HistoryLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a DATA payload to the end of the log.
    pub fn append(&self, payload: impl Into<String>) {
        self.lock().push(payload.into());
    }

    /// Empties the log.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Returns a consistent point-in-time copy of the log, oldest first.
    pub fn replay(&self) -> Vec<String> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
