//! Entry Store Module
//!
//! Owns the key to entry mapping. Knows nothing about eviction, counters or
//! the access log; the engine composes those around it.

use std::collections::HashMap;

use crate::cache::entry::{CacheEntry, EntryMetadata};

// == Lookup ==
/// Result of reading a key at a point in time.
#[derive(Debug)]
pub enum Lookup<'a> {
    Live(&'a mut CacheEntry),
    Expired,
    Missing,
}

#[derive(Debug)]
struct Slot {
    /// Monotonic insertion sequence, used to break LRU ties
    seq: u64,
    entry: CacheEntry,
}

// == Entry Store ==
/// Key-value storage with insertion ordering.
#[derive(Debug, Default)]
pub struct EntryStore {
    slots: HashMap<String, Slot>,
    next_seq: u64,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // == Lookup ==
    /// Looks a key up without removing anything.
    pub fn lookup(&mut self, key: &str, now: u64) -> Lookup<'_> {
        match self.slots.get_mut(key) {
            Some(slot) if slot.entry.is_expired(now) => Lookup::Expired,
            Some(slot) => Lookup::Live(&mut slot.entry),
            None => Lookup::Missing,
        }
    }

    /// Returns true if a live (unexpired) entry exists for `key`.
    pub fn contains_live(&self, key: &str, now: u64) -> bool {
        self.slots
            .get(key)
            .is_some_and(|slot| !slot.entry.is_expired(now))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    // == Insert ==
    /// Stores an entry, replacing any prior entry under the same key.
    ///
    /// A replaced entry takes a fresh insertion sequence.
    pub fn insert(&mut self, entry: CacheEntry) -> Option<CacheEntry> {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.slots
            .insert(entry.key().to_string(), Slot { seq, entry })
            .map(|slot| slot.entry)
    }

    // == Remove ==
    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        self.slots.remove(key).map(|slot| slot.entry)
    }

    pub fn clear(&mut self) -> usize {
        let count = self.slots.len();
        self.slots.clear();
        count
    }

    // == Iteration ==
    /// Iterates entries with their insertion sequence, in no particular order.
    pub fn iter_with_seq(&self) -> impl Iterator<Item = (u64, &CacheEntry)> {
        self.slots.values().map(|slot| (slot.seq, &slot.entry))
    }

    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.slots.values().map(|slot| &slot.entry)
    }

    pub fn metadata(&self) -> impl Iterator<Item = &EntryMetadata> {
        self.entries().map(|entry| &entry.metadata)
    }

    /// Keys whose entries satisfy `predicate`, ordered by insertion.
    pub fn keys_where<F>(&self, mut predicate: F) -> Vec<String>
    where
        F: FnMut(&CacheEntry) -> bool,
    {
        let mut matched: Vec<(u64, &str)> = self
            .slots
            .iter()
            .filter(|(_, slot)| predicate(&slot.entry))
            .map(|(key, slot)| (slot.seq, key.as_str()))
            .collect();
        matched.sort_unstable_by_key(|(seq, _)| *seq);
        matched.into_iter().map(|(_, key)| key.to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
