//! Snapshot Manager Module
//!
//! Versioned point-in-time export and import of the cache contents.
//!
//! The JSON layout is stable under version "1.0": new fields must be
//! additive, and readers ignore fields they do not know.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::{clock, compression};
use crate::cache::engine::AdaptiveCache;
use crate::cache::entry::{CacheEntry, EntryMetadata, StoredValue};
use crate::cache::stats::CacheStatistics;
use crate::config::CacheOptions;
use crate::error::{CacheError, Result};

/// The only snapshot version this engine reads and writes
pub const SNAPSHOT_VERSION: &str = "1.0";

// == Snapshot Types ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub options: CacheOptions,
    pub stats: CacheStatistics,
    #[serde(default)]
    pub entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub key: String,
    pub value: StoredValue,
    pub metadata: EntryMetadata,
}

/// Just enough of a snapshot to decide whether the rest can be read.
#[derive(Deserialize)]
struct Envelope {
    version: String,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a snapshot, rejecting foreign versions before their layout is read.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Same as [`Snapshot::from_json`] for an already-parsed document.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let Envelope { version } = Envelope::deserialize(&value)?;
        if version != SNAPSHOT_VERSION {
            return Err(CacheError::UnsupportedVersion(version));
        }
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Include entry payloads; otherwise only options and statistics
    pub include_data: bool,
    /// Compress raw payloads at export time
    pub compress: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub imported: usize,
    pub total: usize,
}

impl AdaptiveCache {
    // == Export ==
    /// Captures the current options, statistics and optionally the entries.
    ///
    /// Entries are copied out in insertion order.
    pub fn export_snapshot(&self, options: ExportOptions) -> Snapshot {
        let (stats, entries) = {
            let store = self.lock_store();
            let stats = CacheStatistics::derive(&self.inner.counters, &store, self.inner.options.max_size);
            let entries: Vec<CacheEntry> = if options.include_data {
                let mut ordered: Vec<(u64, &CacheEntry)> = store.iter_with_seq().collect();
                ordered.sort_unstable_by_key(|(seq, _)| *seq);
                ordered.into_iter().map(|(_, entry)| entry.clone()).collect()
            } else {
                Vec::new()
            };
            (stats, entries)
        };

        let entries = entries
            .into_iter()
            .map(|entry| self.export_entry(entry, options.compress))
            .collect();

        Snapshot {
            version: SNAPSHOT_VERSION.to_string(),
            timestamp: clock::to_datetime(self.now()),
            options: self.inner.options.clone(),
            stats,
            entries,
        }
    }

    fn export_entry(&self, entry: CacheEntry, compress: bool) -> SnapshotEntry {
        let CacheEntry {
            mut metadata,
            value,
        } = entry;

        let value = match value {
            StoredValue::Raw(raw) if compress => match self.compress_for_export(&raw) {
                Ok(Some((bytes, ratio))) => {
                    metadata.compressed = true;
                    metadata.compression_ratio = ratio;
                    metadata.size_bytes = bytes.len();
                    StoredValue::Compressed(bytes)
                }
                Ok(None) => StoredValue::Raw(raw),
                Err(e) => {
                    warn!(key = %metadata.key, error = %e, "export compression failed, keeping raw value");
                    StoredValue::Raw(raw)
                }
            },
            other => other,
        };

        SnapshotEntry {
            key: metadata.key.clone(),
            value,
            metadata,
        }
    }

    /// Returns `None` when the compressor cannot shrink the payload.
    fn compress_for_export(&self, raw: &serde_json::Value) -> Result<Option<(Vec<u8>, f64)>> {
        let bytes = serde_json::to_vec(raw)?;
        let compressed = self.inner.compressor.compress(&bytes)?;
        if !compression::is_worthwhile(&compressed) {
            return Ok(None);
        }
        Ok(Some((compressed.data, compressed.ratio)))
    }

    // == Import ==
    /// Loads entries from a snapshot, overwriting existing keys.
    ///
    /// Entries already expired at import time are skipped. Import bypasses
    /// the eviction controller, so the store may end up above `max_size`.
    pub fn import_snapshot(&self, snapshot: Snapshot) -> Result<ImportOutcome> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CacheError::UnsupportedVersion(snapshot.version));
        }

        let now = self.now();
        let total = snapshot.entries.len();
        let mut imported = 0;

        let mut store = self.lock_store();
        for SnapshotEntry {
            key,
            value,
            mut metadata,
        } in snapshot.entries
        {
            if metadata.is_expired(now) {
                continue;
            }
            metadata.key = key;
            metadata.compressed = value.is_compressed();
            store.insert(CacheEntry { metadata, value });
            imported += 1;
        }
        drop(store);

        info!(imported, total, "snapshot imported");
        Ok(ImportOutcome { imported, total })
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::cache::entry::{Priority, SetOptions};
    use crate::cache::GetOptions;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    const NO_PREFETCH: GetOptions = GetOptions {
        prefetch: false,
        extend_ttl: false,
    };

    fn cache(clock: Arc<ManualClock>) -> AdaptiveCache {
        AdaptiveCache::builder(CacheOptions::default())
            .clock(clock)
            .build()
            .unwrap()
    }

    #[test]
    fn test_export_without_data() {
        let cache = cache(Arc::new(ManualClock::new(0)));
        cache.set("a", json!(1), &SetOptions::default()).unwrap();

        let snapshot = cache.export_snapshot(ExportOptions::default());
        assert_eq!(snapshot.version, "1.0");
        assert_eq!(snapshot.stats.size, 1);
        assert_eq!(snapshot.options, CacheOptions::default());
        assert!(snapshot.entries.is_empty());
    }

    #[test]
    fn test_export_timestamp_follows_clock() {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let cache = cache(clock.clone());
        clock.advance(5);

        let snapshot = cache.export_snapshot(ExportOptions::default());
        assert_eq!(snapshot.timestamp.timestamp_millis(), 1_700_000_000_005);
    }

    #[test]
    fn test_export_with_data_in_insertion_order() {
        let cache = cache(Arc::new(ManualClock::new(0)));
        for key in ["c", "a", "b"] {
            cache.set(key, json!(key), &SetOptions::default()).unwrap();
        }

        let snapshot = cache.export_snapshot(ExportOptions {
            include_data: true,
            compress: false,
        });
        let keys: Vec<&str> = snapshot.entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["c", "a", "b"]);
        assert_eq!(snapshot.entries[0].value, StoredValue::Raw(json!("c")));
    }

    #[test]
    fn test_export_compress_marks_entries() {
        let cache = cache(Arc::new(ManualClock::new(0)));
        let raw = SetOptions::default().with_compression(false);
        cache.set("big", json!("z".repeat(4096)), &raw).unwrap();

        let snapshot = cache.export_snapshot(ExportOptions {
            include_data: true,
            compress: true,
        });
        let entry = &snapshot.entries[0];
        assert!(entry.value.is_compressed());
        assert!(entry.metadata.compressed);
        assert!(entry.metadata.compression_ratio < 1.0);

        // Stored entry untouched
        let hit = cache.get_with("big", NO_PREFETCH).unwrap().unwrap();
        assert!(!hit.metadata.compressed);
    }

    #[test]
    fn test_import_rejects_unknown_version() {
        let clock = Arc::new(ManualClock::new(0));
        let source = cache(clock.clone());
        source.set("a", json!(1), &SetOptions::default()).unwrap();
        let mut snapshot = source.export_snapshot(ExportOptions {
            include_data: true,
            compress: false,
        });
        snapshot.version = "2.0".to_string();

        let target = cache(clock);
        target.set("existing", json!(0), &SetOptions::default()).unwrap();

        let err = target.import_snapshot(snapshot).unwrap_err();
        assert!(matches!(err, CacheError::UnsupportedVersion(v) if v == "2.0"));
        assert_eq!(target.len(), 1);
    }

    #[test]
    fn test_import_skips_expired_entries() {
        let clock = Arc::new(ManualClock::new(0));
        let source = cache(clock.clone());
        let short = SetOptions::default().with_ttl(Duration::from_millis(10));
        source.set("short", json!(1), &short).unwrap();
        source.set("long", json!(2), &SetOptions::default()).unwrap();
        let snapshot = source.export_snapshot(ExportOptions {
            include_data: true,
            compress: false,
        });

        clock.advance(10);
        let target = cache(clock);
        let outcome = target.import_snapshot(snapshot).unwrap();

        assert_eq!(outcome, ImportOutcome { imported: 1, total: 2 });
        assert!(target.contains("long"));
        assert!(!target.contains("short"));
    }

    #[test]
    fn test_import_overwrites_and_preserves_metadata() {
        let clock = Arc::new(ManualClock::new(0));
        let source = cache(clock.clone());
        let high = SetOptions::default()
            .with_priority(Priority::High)
            .with_tags(["pinned"]);
        source.set("k", json!("from snapshot"), &high).unwrap();
        let snapshot = source.export_snapshot(ExportOptions {
            include_data: true,
            compress: false,
        });

        let target = cache(clock);
        target.set("k", json!("local"), &SetOptions::default()).unwrap();
        target.import_snapshot(snapshot).unwrap();

        let hit = target.get_with("k", NO_PREFETCH).unwrap().unwrap();
        assert_eq!(hit.value, json!("from snapshot"));
        assert_eq!(hit.metadata.priority, Priority::High);
        assert!(hit.metadata.tags.contains("pinned"));
        assert_eq!(target.statistics().evictions, 0);
    }

    #[test]
    fn test_import_corrupt_payload_dropped_on_read() {
        let clock = Arc::new(ManualClock::new(0));
        let source = cache(clock.clone());
        source.set("k", json!("v"), &SetOptions::default()).unwrap();
        let mut snapshot = source.export_snapshot(ExportOptions {
            include_data: true,
            compress: false,
        });
        snapshot.entries[0].value = StoredValue::Compressed(vec![1, 2, 3]);

        let target = cache(clock);
        assert_eq!(target.import_snapshot(snapshot).unwrap().imported, 1);

        assert!(target.get_with("k", NO_PREFETCH).is_err());
        assert_eq!(target.statistics().hits, 0);
        assert!(target.get_with("k", NO_PREFETCH).unwrap().is_none());
    }

    #[test]
    fn test_json_ignores_unknown_fields() {
        let cache = cache(Arc::new(ManualClock::new(0)));
        cache.set("a", json!([1, 2, 3]), &SetOptions::default()).unwrap();
        let snapshot = cache.export_snapshot(ExportOptions {
            include_data: true,
            compress: false,
        });

        let mut json: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        json["producer"] = json!("newer-writer");
        json["entries"][0]["checksum"] = json!("abc");

        let parsed = Snapshot::from_json(&json.to_string()).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_json_foreign_version_checked_before_layout() {
        let err = Snapshot::from_json(r#"{"version":"2.0","created":"x","entries":[]}"#).unwrap_err();
        assert!(matches!(err, CacheError::UnsupportedVersion(v) if v == "2.0"));

        let err = Snapshot::from_json(r#"{"entries":[]}"#).unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));
    }
}
