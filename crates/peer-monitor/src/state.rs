//! Shared monitor state.
//!
//! [`MonitorState`] is constructed once at start-up and handed to the HTTP
//! layer behind an `Arc`. The registry, activity log and traffic totals
//! live under a single lock so a send updates all of them as one step.

use crate::activity::{ActivityLog, ActivityLogEntry};
use crate::error::{MonitorError, Result};
use crate::registry::{
    PeerRecord, PeerRegistry, SendReceipt, SendRequest, TrafficTotals, unix_timestamp_ms,
};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Message returned when a send names no sender or receiver.
pub const MISSING_ENDPOINTS: &str = "from and to are required";

#[derive(Debug, Default)]
struct MonitorInner {
    peers: PeerRegistry,
    activity: ActivityLog,
    totals: TrafficTotals,
}

/// Process-wide peer registry, activity log and traffic totals.
#[derive(Debug)]
pub struct MonitorState {
    inner: RwLock<MonitorInner>,
    started_at: Instant,
}

impl MonitorState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MonitorInner::default()),
            started_at: Instant::now(),
        }
    }

    /// Time since this state was constructed.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Apply a send at the current wall-clock time.
    pub async fn record_send(&self, request: &SendRequest) -> Result<SendReceipt> {
        self.record_send_at(request, unix_timestamp_ms()).await
    }

    /// Apply a send as if it happened at `now_ms`.
    ///
    /// Both peers are created on first reference, both are marked active,
    /// the sender's `sent_bytes`, the receiver's `received_bytes` and the
    /// global totals grow by the same amount, and one activity entry is
    /// appended. Nothing changes when validation fails.
    pub async fn record_send_at(&self, request: &SendRequest, now_ms: u64) -> Result<SendReceipt> {
        let from = request.from.as_deref().unwrap_or_default().trim();
        let to = request.to.as_deref().unwrap_or_default().trim();
        if from.is_empty() || to.is_empty() {
            return Err(MonitorError::Validation(MISSING_ENDPOINTS.to_string()));
        }
        let bytes = request.effective_bytes();

        let mut inner = self.inner.write().await;
        let sender = inner.peers.upsert(from, now_ms);
        sender.sent_bytes = sender.sent_bytes.saturating_add(bytes);
        let mut from_record = sender.clone();
        let receiver = inner.peers.upsert(to, now_ms);
        receiver.received_bytes = receiver.received_bytes.saturating_add(bytes);
        let to_record = receiver.clone();
        // self-send: one record carries both counters
        if from == to {
            from_record = to_record.clone();
        }
        inner.totals.record(bytes);
        inner
            .activity
            .append(format!("send from {from} to {to} ({bytes} bytes)"));
        drop(inner);

        let receipt = SendReceipt {
            from: from_record,
            to: to_record,
        };

        debug!(from, to, bytes, "Recorded send");
        Ok(receipt)
    }

    /// All peers, most recently active first.
    pub async fn peers(&self) -> Vec<PeerRecord> {
        self.inner.read().await.peers.list()
    }

    /// The last `n` activity entries, oldest first.
    pub async fn recent_activity(&self, n: usize) -> Vec<ActivityLogEntry> {
        self.inner.read().await.activity.recent(n)
    }

    /// Append a free-form event to the activity log.
    pub async fn log_event(&self, message: impl Into<String>) {
        self.inner.write().await.activity.append(message);
    }

    pub async fn totals(&self) -> TrafficTotals {
        self.inner.read().await.totals
    }
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::new()
    }
}
