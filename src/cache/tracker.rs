//! Access Tracker Module
//!
//! Bounded append-only log of cache operations, consumed by the prefetch
//! advisor and pattern analysis.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::cache::eviction::EvictionReason;

/// Log length that triggers truncation
pub const HISTORY_CAP: usize = 10_000;

/// Number of most recent events kept after truncation
pub const HISTORY_WATERMARK: usize = 5_000;

// == Event Types ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Hit,
    Miss,
    Set,
    Delete,
    EvictExpired,
    EvictLru,
}

impl From<EvictionReason> for EventType {
    fn from(reason: EvictionReason) -> Self {
        match reason {
            EvictionReason::Expired => EventType::EvictExpired,
            EvictionReason::Lru => EventType::EvictLru,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEvent {
    pub key: String,
    pub event_type: EventType,
    /// Unix milliseconds
    pub timestamp: u64,
}

// == Access Tracker ==
#[derive(Debug, Default)]
pub struct AccessTracker {
    events: VecDeque<AccessEvent>,
}

impl AccessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // == Record ==
    /// Appends an event, dropping the oldest half once the cap is exceeded.
    pub fn record(&mut self, key: &str, event_type: EventType, timestamp: u64) {
        self.events.push_back(AccessEvent {
            key: key.to_string(),
            event_type,
            timestamp,
        });

        if self.events.len() > HISTORY_CAP {
            let excess = self.events.len() - HISTORY_WATERMARK;
            self.events.drain(..excess);
        }
    }

    // == Queries ==
    /// The last `limit` events for `key`, oldest first.
    pub fn recent_by_key(&self, key: &str, limit: usize) -> Vec<AccessEvent> {
        let mut recent: Vec<AccessEvent> = self
            .events
            .iter()
            .rev()
            .filter(|event| event.key == key)
            .take(limit)
            .cloned()
            .collect();
        recent.reverse();
        recent
    }

    /// The last `from_end` events, oldest first.
    pub fn slice(&self, from_end: usize) -> Vec<AccessEvent> {
        let start = self.events.len().saturating_sub(from_end);
        self.events.range(start..).cloned().collect()
    }

    /// Iterates the whole log, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &AccessEvent> {
        self.events.iter()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.events.len()
    }
}
