//! Bounded activity log.
//!
//! Keeps the most recent [`ACTIVITY_LOG_CAPACITY`] events in arrival order.
//! Once full, every append evicts the oldest entry.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Maximum number of entries retained.
pub const ACTIVITY_LOG_CAPACITY: usize = 200;

/// Number of entries served by the `/logs` endpoint.
pub const RECENT_LOG_WINDOW: usize = 100;

/// A single timestamped event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    /// RFC 3339 UTC timestamp with millisecond precision
    pub timestamp: String,
    /// Human-readable event description
    pub message: String,
}

/// FIFO ring of activity entries.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<ActivityLogEntry>,
    capacity: usize,
}

impl ActivityLog {
    /// Create an empty log with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(ACTIVITY_LOG_CAPACITY)
    }

    /// Create an empty log holding at most `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.saturating_add(1)),
            capacity,
        }
    }

    /// Stamp `message` with the current time and append it.
    pub fn append(&mut self, message: impl Into<String>) {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.push(ActivityLogEntry {
            timestamp,
            message: message.into(),
        });
    }

    fn push(&mut self, entry: ActivityLogEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// The last `n` entries, oldest first.
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<ActivityLogEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}
