//! Cache Engine Module
//!
//! [`AdaptiveCache`] composes the entry store, eviction controller, access
//! tracker, counters and injected collaborators behind one cloneable handle.
//!
//! Expiry is lazy: an entry is only checked against its TTL when it is read.
//! Entries that are never read again stay resident until capacity pressure
//! evicts them, and a high-priority entry that is never read stays forever.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::analysis::PatternAnalyzer;
use crate::cache::batch::{FixedBatchSize, OptimizationHint};
use crate::cache::clock::{Clock, SystemClock};
use crate::cache::compression::{self, Compressor, ZstdCompressor};
use crate::cache::entry::{duration_ms, CacheEntry, EntryMetadata, Priority, SetOptions, StoredValue};
use crate::cache::eviction::{EvictionController, EvictionReason};
use crate::cache::prefetch::{Prediction, PrefetchAdvisor, ValueLoader, WarmOutcome};
use crate::cache::stats::{CacheCounters, CacheStatistics};
use crate::cache::store::{EntryStore, Lookup};
use crate::cache::tracker::{AccessEvent, AccessTracker, EventType};
use crate::cache::MAX_KEY_LENGTH;
use crate::config::CacheOptions;
use crate::error::{CacheError, Result};
use crate::tasks::spawn_prefetch_task;

// == Call Types ==
/// Per-read options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetOptions {
    /// Spawn the prefetch advisor after a hit
    pub prefetch: bool,
    /// Push the expiry of a hit entry to now + default TTL
    pub extend_ttl: bool,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            prefetch: true,
            extend_ttl: false,
        }
    }
}

/// A successful read: the decoded value and a copy of its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheHit {
    pub value: Value,
    pub metadata: EntryMetadata,
}

/// Keys removed by a pattern or tag clear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearOutcome {
    pub cleared: usize,
    pub keys: Vec<String>,
}

/// A validated, encoded write waiting for the store lock.
pub(crate) struct PendingEntry {
    key: String,
    stored: StoredValue,
    size_bytes: usize,
    compression_ratio: f64,
    ttl_ms: u64,
    priority: Priority,
    tags: BTreeSet<String>,
}

// == Shared State ==
pub(crate) struct Inner {
    pub(crate) options: CacheOptions,
    pub(crate) store: Mutex<EntryStore>,
    pub(crate) tracker: Mutex<AccessTracker>,
    pub(crate) counters: CacheCounters,
    pub(crate) eviction: EvictionController,
    pub(crate) advisor: PrefetchAdvisor,
    pub(crate) compressor: Arc<dyn Compressor>,
    pub(crate) hint: Arc<dyn OptimizationHint>,
    pub(crate) loader: Option<Arc<dyn ValueLoader>>,
    pub(crate) analyzer: Option<Arc<dyn PatternAnalyzer>>,
    pub(crate) clock: Arc<dyn Clock>,
}

// == Adaptive Cache ==
/// Thread-safe cache handle. Clones share the same state.
#[derive(Clone)]
pub struct AdaptiveCache {
    pub(crate) inner: Arc<Inner>,
}

impl fmt::Debug for AdaptiveCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptiveCache")
            .field("options", &self.inner.options)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl AdaptiveCache {
    // == Constructors ==
    /// Creates a cache with default collaborators.
    pub fn new(options: CacheOptions) -> Result<Self> {
        Self::builder(options).build()
    }

    pub fn builder(options: CacheOptions) -> CacheBuilder {
        CacheBuilder::new(options)
    }

    pub fn options(&self) -> &CacheOptions {
        &self.inner.options
    }

    // == Get ==
    /// Reads a key with default options (prefetch on).
    pub fn get(&self, key: &str) -> Result<Option<CacheHit>> {
        self.get_with(key, GetOptions::default())
    }

    /// Reads a key.
    ///
    /// Returns `Ok(None)` for keys that never existed and for expired keys;
    /// the latter are evicted as a side effect. A stored payload that cannot
    /// be decoded is dropped, counted as a miss and reported as an error.
    pub fn get_with(&self, key: &str, options: GetOptions) -> Result<Option<CacheHit>> {
        let now = self.now();

        let found = {
            let mut store = self.lock_store();
            let found = match store.lookup(key, now) {
                Lookup::Live(entry) => Some(self.decode(entry.value.clone()).map(|value| {
                    let meta = &mut entry.metadata;
                    meta.access_count += 1;
                    meta.last_accessed = now;
                    if options.extend_ttl {
                        meta.expires_at = now.saturating_add(self.inner.options.ttl_ms);
                    }
                    (value, entry.metadata.clone())
                })),
                Lookup::Expired => {
                    self.evict_locked(&mut store, key, EvictionReason::Expired, now);
                    None
                }
                Lookup::Missing => None,
            };
            if matches!(found, Some(Err(_))) {
                store.remove(key);
            }
            found
        };

        let (value, metadata) = match found {
            Some(Ok(hit)) => hit,
            Some(Err(e)) => {
                warn!(key, error = %e, "dropping undecodable entry");
                self.inner.counters.record_miss();
                self.record(key, EventType::Miss, now);
                return Err(e);
            }
            None => {
                self.inner.counters.record_miss();
                self.record(key, EventType::Miss, now);
                return Ok(None);
            }
        };

        self.inner.counters.record_hit();
        self.record(key, EventType::Hit, now);

        if options.prefetch {
            spawn_prefetch_task(self.clone(), key.to_string());
        }

        Ok(Some(CacheHit { value, metadata }))
    }

    /// Reads a key that must exist.
    pub fn get_existing(&self, key: &str) -> Result<CacheHit> {
        self.get_with(key, GetOptions::default())?
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    /// Returns true if a live entry exists. Touches neither counters nor LRU order.
    pub fn contains(&self, key: &str) -> bool {
        let now = self.now();
        self.lock_store().contains_live(key, now)
    }

    // == Set ==
    /// Stores a value, replacing any prior entry under the same key.
    ///
    /// A new key arriving at capacity evicts one LRU victim first; if every
    /// entry is high priority nothing is evicted and the store grows past
    /// `max_size`. TTLs too large to represent saturate at `u64::MAX`.
    pub fn set(&self, key: &str, value: Value, options: &SetOptions) -> Result<EntryMetadata> {
        let pending = self.prepare(key, value, options)?;
        let now = self.now();
        let metadata = self.commit_locked(&mut self.lock_store(), pending, now);

        debug!(key, size_bytes = metadata.size_bytes, priority = ?metadata.priority, "set");
        Ok(metadata)
    }

    /// Validates and encodes a write without touching the store.
    pub(crate) fn prepare(&self, key: &str, value: Value, options: &SetOptions) -> Result<PendingEntry> {
        validate_key(key)?;

        let ttl_ms = match options.ttl {
            Some(ttl) => duration_ms(ttl),
            None => self.inner.options.ttl_ms,
        };
        if ttl_ms == 0 {
            return Err(CacheError::InvalidRequest("TTL must be positive".to_string()));
        }

        let compress = options
            .compress
            .unwrap_or(self.inner.options.compression_enabled);
        let (stored, size_bytes, compression_ratio) = self.encode(key, value, compress)?;

        Ok(PendingEntry {
            key: key.to_string(),
            stored,
            size_bytes,
            compression_ratio,
            ttl_ms,
            priority: options.priority.unwrap_or_default(),
            tags: options.tags.iter().flatten().cloned().collect(),
        })
    }

    /// Inserts a prepared write, evicting first when a new key meets a full store.
    pub(crate) fn commit_locked(&self, store: &mut EntryStore, pending: PendingEntry, now: u64) -> EntryMetadata {
        let PendingEntry {
            key,
            stored,
            size_bytes,
            compression_ratio,
            ttl_ms,
            priority,
            tags,
        } = pending;

        let metadata = EntryMetadata {
            key,
            size_bytes,
            compressed: stored.is_compressed(),
            compression_ratio,
            created_at: now,
            expires_at: now.saturating_add(ttl_ms),
            last_accessed: now,
            access_count: 0,
            priority,
            tags,
        };

        if self.inner.eviction.needs_room(store, &metadata.key) {
            self.make_room(store, now);
        }
        store.insert(CacheEntry {
            metadata: metadata.clone(),
            value: stored,
        });
        self.record(&metadata.key, EventType::Set, now);
        metadata
    }

    // == Delete ==
    /// Removes an entry. Returns true if one was present.
    pub fn delete(&self, key: &str) -> bool {
        let now = self.now();
        let mut store = self.lock_store();
        let removed = store.remove(key).is_some();
        if removed {
            self.record(key, EventType::Delete, now);
        }
        removed
    }

    // == Clear ==
    /// Removes every entry and resets the access log.
    pub fn clear_all(&self) -> usize {
        let cleared = {
            let mut store = self.lock_store();
            let cleared = store.clear();
            self.lock_tracker().clear();
            cleared
        };
        info!(cleared, "cache cleared");
        cleared
    }

    /// Removes every entry whose key matches the regular expression.
    pub fn clear_by_pattern(&self, pattern: &str) -> Result<ClearOutcome> {
        let regex = regex::Regex::new(pattern)?;
        let outcome = self.remove_where(|entry| regex.is_match(entry.key()));
        info!(pattern, cleared = outcome.cleared, "cleared by pattern");
        Ok(outcome)
    }

    /// Removes every entry carrying at least one of `tags`.
    pub fn clear_by_tags<S: AsRef<str>>(&self, tags: &[S]) -> ClearOutcome {
        let outcome = self.remove_where(|entry| entry.metadata.has_any_tag(tags));
        info!(cleared = outcome.cleared, "cleared by tags");
        outcome
    }

    fn remove_where<F>(&self, predicate: F) -> ClearOutcome
    where
        F: FnMut(&CacheEntry) -> bool,
    {
        let now = self.now();
        let mut store = self.lock_store();
        let keys = store.keys_where(predicate);
        for key in &keys {
            store.remove(key);
            self.record(key, EventType::Delete, now);
        }
        ClearOutcome {
            cleared: keys.len(),
            keys,
        }
    }

    // == Prefetch ==
    /// Stores predicted entries with `Predicted` priority.
    ///
    /// Skips keys already present, predictions at or below the confidence
    /// floor, and predictions without a concrete value.
    pub fn warm_cache(&self, predictions: Vec<Prediction>) -> WarmOutcome {
        let mut outcome = WarmOutcome::default();

        for prediction in predictions {
            if !prediction.is_confident() || self.contains(&prediction.key) {
                continue;
            }
            let Some(value) = prediction.value else {
                continue;
            };

            let mut options = SetOptions::default().with_priority(Priority::Predicted);
            options.ttl = prediction.ttl;

            match self.set(&prediction.key, value, &options) {
                Ok(_) => outcome.keys.push(prediction.key),
                Err(e) => warn!(key = %prediction.key, error = %e, "failed to warm predicted key"),
            }
        }

        outcome.warmed = outcome.keys.len();
        outcome
    }

    /// Predicts keys that follow `key` in the access log and warms those a
    /// [`ValueLoader`] can resolve.
    pub fn prefetch_related(&self, key: &str) -> WarmOutcome {
        let predictions = self.pending_predictions(key);
        self.load_and_warm(predictions)
    }

    /// Predictions worth loading: confident, not yet cached, and only when a
    /// loader exists to resolve them.
    pub(crate) fn pending_predictions(&self, key: &str) -> Vec<Prediction> {
        if self.inner.loader.is_none() {
            return Vec::new();
        }
        let predictions = {
            let tracker = self.lock_tracker();
            self.inner.advisor.predict(&tracker, key)
        };
        predictions
            .into_iter()
            .filter(|p| p.is_confident() && !self.contains(&p.key))
            .collect()
    }

    /// Resolves values through the loader and warms the cache with them.
    pub(crate) fn load_and_warm(&self, mut predictions: Vec<Prediction>) -> WarmOutcome {
        if predictions.is_empty() {
            return WarmOutcome::default();
        }

        if let Some(loader) = &self.inner.loader {
            for prediction in predictions.iter_mut() {
                if prediction.value.is_none() && !self.contains(&prediction.key) {
                    prediction.value = loader.load(&prediction.key);
                }
            }
        }

        debug!(predictions = predictions.len(), "prefetching related keys");
        self.warm_cache(predictions)
    }

    // == Introspection ==
    pub fn statistics(&self) -> CacheStatistics {
        let store = self.lock_store();
        CacheStatistics::derive(&self.inner.counters, &store, self.inner.options.max_size)
    }

    /// The last `from_end` access events, oldest first.
    pub fn access_history(&self, from_end: usize) -> Vec<AccessEvent> {
        self.lock_tracker().slice(from_end)
    }

    /// The last `limit` access events for `key`, oldest first.
    pub fn recent_accesses(&self, key: &str, limit: usize) -> Vec<AccessEvent> {
        self.lock_tracker().recent_by_key(key, limit)
    }

    /// Number of resident entries, expired-but-unread ones included.
    pub fn len(&self) -> usize {
        self.lock_store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_store().is_empty()
    }

    // == Internals ==
    pub(crate) fn now(&self) -> u64 {
        self.inner.clock.now_ms()
    }

    pub(crate) fn lock_store(&self) -> MutexGuard<'_, EntryStore> {
        self.inner.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn lock_tracker(&self) -> MutexGuard<'_, AccessTracker> {
        self.inner.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, key: &str, event_type: EventType, now: u64) {
        self.lock_tracker().record(key, event_type, now);
    }

    fn make_room(&self, store: &mut EntryStore, now: u64) {
        match self.inner.eviction.select_victim(store) {
            Some(victim) => self.evict_locked(store, &victim, EvictionReason::Lru, now),
            None => warn!(
                size = store.len(),
                max_size = self.inner.eviction.max_size(),
                "all entries are high priority, growing past capacity"
            ),
        }
    }

    fn evict_locked(&self, store: &mut EntryStore, key: &str, reason: EvictionReason, now: u64) {
        if store.remove(key).is_some() {
            self.inner.counters.record_eviction();
            self.record(key, reason.into(), now);
            debug!(key, ?reason, "evicted");
        }
    }

    /// Produces the stored form of a value, compressing when the policy allows.
    fn encode(&self, key: &str, value: Value, compress: bool) -> Result<(StoredValue, usize, f64)> {
        let raw_size = compression::estimate_size(&value);
        if !compression::should_compress(raw_size, compress) {
            return Ok((StoredValue::Raw(value), raw_size, 1.0));
        }

        let bytes = serde_json::to_vec(&value)?;
        match self.inner.compressor.compress(&bytes) {
            Ok(compressed) if compression::is_worthwhile(&compressed) => {
                let size = compressed.data.len();
                self.inner
                    .counters
                    .record_compression_savings(bytes.len().saturating_sub(size) as u64);
                Ok((StoredValue::Compressed(compressed.data), size, compressed.ratio))
            }
            Ok(_) => Ok((StoredValue::Raw(value), raw_size, 1.0)),
            Err(e) => {
                warn!(key, error = %e, "compression failed, storing uncompressed");
                Ok((StoredValue::Raw(value), raw_size, 1.0))
            }
        }
    }

    pub(crate) fn decode(&self, stored: StoredValue) -> Result<Value> {
        match stored {
            StoredValue::Raw(value) => Ok(value),
            StoredValue::Compressed(bytes) => {
                let raw = self.inner.compressor.decompress(&bytes)?;
                Ok(serde_json::from_slice(&raw)?)
            }
        }
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

// == Builder ==
/// Wires collaborators into a cache. Unset collaborators get defaults:
/// zstd compression, a fixed batch size of 100 and the system clock.
pub struct CacheBuilder {
    options: CacheOptions,
    compressor: Option<Arc<dyn Compressor>>,
    hint: Option<Arc<dyn OptimizationHint>>,
    loader: Option<Arc<dyn ValueLoader>>,
    analyzer: Option<Arc<dyn PatternAnalyzer>>,
    clock: Option<Arc<dyn Clock>>,
}

impl CacheBuilder {
    pub fn new(options: CacheOptions) -> Self {
        Self {
            options,
            compressor: None,
            hint: None,
            loader: None,
            analyzer: None,
            clock: None,
        }
    }

    pub fn compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = Some(compressor);
        self
    }

    pub fn optimization_hint(mut self, hint: Arc<dyn OptimizationHint>) -> Self {
        self.hint = Some(hint);
        self
    }

    pub fn value_loader(mut self, loader: Arc<dyn ValueLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn pattern_analyzer(mut self, analyzer: Arc<dyn PatternAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<AdaptiveCache> {
        if self.options.max_size == 0 {
            return Err(CacheError::InvalidRequest("max_size must be positive".to_string()));
        }
        if self.options.ttl_ms == 0 {
            return Err(CacheError::InvalidRequest("ttl must be positive".to_string()));
        }

        let eviction = EvictionController::new(self.options.eviction_policy, self.options.max_size);
        let inner = Inner {
            store: Mutex::new(EntryStore::new()),
            tracker: Mutex::new(AccessTracker::new()),
            counters: CacheCounters::new(),
            eviction,
            advisor: PrefetchAdvisor::new(),
            compressor: self
                .compressor
                .unwrap_or_else(|| Arc::new(ZstdCompressor::default())),
            hint: self.hint.unwrap_or_else(|| Arc::new(FixedBatchSize::default())),
            loader: self.loader,
            analyzer: self.analyzer,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            options: self.options,
        };

        Ok(AdaptiveCache {
            inner: Arc::new(inner),
        })
    }
}
