//! Cache Statistics Module
//!
//! Counters mutated by the engine, and the statistics derived from them.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::cache::store::EntryStore;

// == Cache Counters ==
/// Lock-free operation counters.
#[derive(Debug, Default)]
pub struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    /// Bytes saved by compression, cumulative
    compression_savings: AtomicU64,
}

impl CacheCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_compression_savings(&self, bytes: u64) {
        self.compression_savings.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn compression_savings(&self) -> u64 {
        self.compression_savings.load(Ordering::Relaxed)
    }
}

// == Cache Statistics ==
/// Point-in-time view of the cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheStatistics {
    pub size: usize,
    pub max_size: usize,
    /// size / max_size
    pub utilization: f64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub evictions: u64,
    /// Bytes saved by compression
    pub compression_savings: u64,
    pub average_access_count: f64,
    /// Sum of estimated entry sizes in bytes
    pub memory_usage: u64,
}

impl CacheStatistics {
    // == Derive ==
    /// Computes statistics from the counters and a consistent view of the store.
    pub fn derive(counters: &CacheCounters, store: &EntryStore, max_size: usize) -> Self {
        let size = store.len();
        let hits = counters.hits();
        let misses = counters.misses();

        let (total_accesses, memory_usage) = store
            .metadata()
            .fold((0u64, 0u64), |(accesses, bytes), meta| {
                (accesses + meta.access_count, bytes + meta.size_bytes as u64)
            });

        Self {
            size,
            max_size,
            utilization: ratio(size as u64, max_size as u64),
            hits,
            misses,
            hit_rate: hit_rate(hits, misses),
            evictions: counters.evictions(),
            compression_savings: counters.compression_savings(),
            average_access_count: ratio(total_accesses, size as u64),
            memory_usage,
        }
    }
}

// == Hit Rate ==
/// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
pub fn hit_rate(hits: u64, misses: u64) -> f64 {
    ratio(hits, hits + misses)
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
