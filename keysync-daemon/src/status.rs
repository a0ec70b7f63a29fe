//! Status reporter that keeps recent messages for the control socket.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use keysync_sync::StatusReporter;

use crate::paths::STATUS_HISTORY;

/// One user-visible status message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub at_unix: u64,
    pub message: String,
}

/// Bounded, shareable history of status messages. Oldest messages drop first.
#[derive(Debug, Clone)]
pub struct StatusLog {
    entries: Arc<Mutex<VecDeque<StatusEntry>>>,
    capacity: usize,
}

impl Default for StatusLog {
    fn default() -> Self {
        Self::with_capacity(STATUS_HISTORY)
    }
}

impl StatusLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Snapshot, oldest first.
    pub fn recent(&self) -> Vec<StatusEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

impl StatusReporter for StatusLog {
    fn report(&self, message: &str) {
        tracing::info!(status = %message, "sync status");
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(StatusEntry {
            at_unix: unix_seconds_now(),
            message: message.to_string(),
        });
    }
}

pub(crate) fn unix_seconds_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
