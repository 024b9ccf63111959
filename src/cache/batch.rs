//! Batch Coordinator Module
//!
//! Multi-key reads and writes. Writes are chunked by a batch size suggested
//! by an [`OptimizationHint`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::engine::{AdaptiveCache, GetOptions};
use crate::cache::entry::{EntryMetadata, SetOptions};
use crate::error::Result;

/// Batch size used when the hint has nothing usable
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Workload name passed to the hint for `mset`
pub const BATCH_WORKLOAD: &str = "batch_caching";

// == Optimization Hint ==
/// Suggests a batch size for a named workload. Zero means "no opinion".
pub trait OptimizationHint: Send + Sync {
    fn suggest_batch_size(&self, workload: &str) -> Result<usize>;
}

/// Hint that always answers with the same size.
#[derive(Debug, Clone, Copy)]
pub struct FixedBatchSize(pub usize);

impl Default for FixedBatchSize {
    fn default() -> Self {
        Self(DEFAULT_BATCH_SIZE)
    }
}

impl OptimizationHint for FixedBatchSize {
    fn suggest_batch_size(&self, _workload: &str) -> Result<usize> {
        Ok(self.0)
    }
}

/// Asks the hint for a batch size, falling back to [`DEFAULT_BATCH_SIZE`].
pub fn resolve_batch_size(hint: &dyn OptimizationHint, workload: &str) -> usize {
    match hint.suggest_batch_size(workload) {
        Ok(0) => DEFAULT_BATCH_SIZE,
        Ok(size) => size,
        Err(e) => {
            warn!(error = %e, workload, "optimization hint failed, using default batch size");
            DEFAULT_BATCH_SIZE
        }
    }
}

// == Batch Types ==
/// One write in an `mset` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub key: String,
    pub value: Value,
    /// Overrides the batch-level options field by field
    #[serde(default)]
    pub options: Option<SetOptions>,
}

impl BatchEntry {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
            options: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MGetOutcome {
    pub found: HashMap<String, Value>,
    /// Requested keys that missed, in request order
    pub missing: Vec<String>,
    /// found / requested, 0 for an empty request
    pub hit_rate: f64,
}

impl AdaptiveCache {
    // == MGet ==
    /// Reads several keys. Prefetch is disabled for bulk reads.
    pub fn mget<S: AsRef<str>>(&self, keys: &[S]) -> Result<MGetOutcome> {
        let options = GetOptions {
            prefetch: false,
            ..GetOptions::default()
        };

        let mut outcome = MGetOutcome::default();
        for key in keys {
            let key = key.as_ref();
            match self.get_with(key, options)? {
                Some(hit) => {
                    outcome.found.insert(key.to_string(), hit.value);
                }
                None => outcome.missing.push(key.to_string()),
            }
        }

        if !keys.is_empty() {
            outcome.hit_rate = outcome.found.len() as f64 / keys.len() as f64;
        }
        Ok(outcome)
    }

    // == MSet ==
    /// Writes several entries in hint-sized chunks, preserving input order.
    ///
    /// Each chunk is validated and encoded up front, then committed under a
    /// single store lock, so readers never observe a half-written chunk. A
    /// failing entry aborts its chunk; earlier chunks stay written.
    pub fn mset(&self, entries: Vec<BatchEntry>, options: &SetOptions) -> Result<Vec<EntryMetadata>> {
        let batch_size = resolve_batch_size(self.inner.hint.as_ref(), BATCH_WORKLOAD);
        debug!(entries = entries.len(), batch_size, "mset");

        let mut metadata = Vec::with_capacity(entries.len());
        let mut remaining = entries.into_iter().peekable();
        while remaining.peek().is_some() {
            let pending = remaining
                .by_ref()
                .take(batch_size)
                .map(|entry| {
                    let effective = match &entry.options {
                        Some(own) => own.merged_over(options),
                        None => options.clone(),
                    };
                    self.prepare(&entry.key, entry.value, &effective)
                })
                .collect::<Result<Vec<_>>>()?;

            let now = self.now();
            let mut store = self.lock_store();
            for entry in pending {
                metadata.push(self.commit_locked(&mut store, entry, now));
            }
        }
        Ok(metadata)
    }
}
