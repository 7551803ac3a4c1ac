//! Peer Registry Module
//!
//! Tracks every peer the monitor has heard about. A peer exists from the
//! first time any send references it; there is no explicit registration
//! and no expiry. Each reference refreshes the peer's `last_seen_millis`.
//!
//! ```text
//!   POST /send {from, to}
//!          │
//!          ▼
//!   ┌──────────────┐   upsert(from) ──► sent_bytes     += n
//!   │ PeerRegistry │   upsert(to)   ──► received_bytes += n
//!   └──────────────┘
//!          │
//!          ▼
//!   GET /peers  (last_seen desc)
//! ```

mod store;
mod types;

pub use store::PeerRegistry;
pub use types::{PeerRecord, SendReceipt, SendRequest, TrafficTotals, unix_timestamp_ms};
