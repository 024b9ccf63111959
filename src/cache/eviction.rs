//! Eviction Controller Module
//!
//! Chooses LRU victims when the store is at capacity. High-priority entries
//! are never chosen; TTL expiry is handled lazily by the engine on read.

use serde::{Deserialize, Serialize};

use crate::cache::entry::Priority;
use crate::cache::store::EntryStore;
use crate::config::EvictionPolicy;

// == Eviction Reason ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionReason {
    /// TTL elapsed, detected on read
    Expired,
    /// Capacity pressure
    Lru,
}

// == Eviction Controller ==
#[derive(Debug, Clone)]
pub struct EvictionController {
    policy: EvictionPolicy,
    max_size: usize,
}

impl EvictionController {
    pub fn new(policy: EvictionPolicy, max_size: usize) -> Self {
        Self { policy, max_size }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    // == Needs Room ==
    /// Returns true if writing `key` would grow the store past capacity.
    ///
    /// Overwrites never grow the store.
    pub fn needs_room(&self, store: &EntryStore, key: &str) -> bool {
        !store.contains(key) && store.len() >= self.max_size
    }

    // == Select Victim ==
    /// Picks the entry to evict, or None if every entry is high priority.
    ///
    /// Order: smallest `last_accessed`, then earliest `created_at`, then
    /// earliest insertion.
    pub fn select_victim(&self, store: &EntryStore) -> Option<String> {
        match self.policy {
            EvictionPolicy::Lru => store
                .iter_with_seq()
                .filter(|(_, entry)| entry.metadata.priority != Priority::High)
                .min_by_key(|(seq, entry)| {
                    (entry.metadata.last_accessed, entry.metadata.created_at, *seq)
                })
                .map(|(_, entry)| entry.key().to_string()),
        }
    }
}
