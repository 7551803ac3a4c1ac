//! In-memory peer store.

use super::types::PeerRecord;
use std::collections::HashMap;

/// Mapping from node id to its [`PeerRecord`], created on first reference.
///
/// Records are kept in insertion order so that peers with identical
/// `last_seen_millis` list in a stable order.
#[derive(Debug, Clone, Default)]
pub struct PeerRegistry {
    peers: Vec<PeerRecord>,
    index: HashMap<String, usize>,
}

impl PeerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `id`, creating a zeroed record if it is unseen, and mark it
    /// active at `now_ms`.
    pub fn upsert(&mut self, id: &str, now_ms: u64) -> &mut PeerRecord {
        let slot = match self.index.get(id) {
            Some(&slot) => slot,
            None => {
                let slot = self.peers.len();
                self.peers.push(PeerRecord::new(id, now_ms));
                self.index.insert(id.to_string(), slot);
                slot
            }
        };
        let peer = &mut self.peers[slot];
        peer.last_seen_millis = now_ms;
        peer
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&PeerRecord> {
        self.index.get(id).map(|&slot| &self.peers[slot])
    }

    /// All peers, most recently active first.
    #[must_use]
    pub fn list(&self) -> Vec<PeerRecord> {
        let mut peers = self.peers.clone();
        peers.sort_by(|a, b| b.last_seen_millis.cmp(&a.last_seen_millis));
        peers
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
