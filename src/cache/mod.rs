//! Cache Module
//!
//! Provides in-memory caching with lazy TTL expiry, LRU eviction with
//! priority exemption, compression, prefetch and snapshots.

mod analysis;
mod batch;
mod clock;
mod compression;
mod engine;
mod entry;
mod eviction;
mod prefetch;
mod snapshot;
mod stats;
mod store;
mod tracker;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use analysis::{
    DetectedPattern, PatternAnalysis, PatternAnalyzer, PatternReport, Recommendation,
    RecommendationKind,
};
pub use batch::{
    BatchEntry, FixedBatchSize, MGetOutcome, OptimizationHint, BATCH_WORKLOAD, DEFAULT_BATCH_SIZE,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use compression::{Compressed, Compressor, ZstdCompressor, COMPRESSION_THRESHOLD_BYTES};
pub use engine::{AdaptiveCache, CacheBuilder, CacheHit, ClearOutcome, GetOptions};
pub use entry::{CacheEntry, EntryMetadata, Priority, SetOptions, StoredValue};
pub use eviction::EvictionReason;
pub use prefetch::{Prediction, ValueLoader, WarmOutcome};
pub use snapshot::{ExportOptions, ImportOutcome, Snapshot, SnapshotEntry, SNAPSHOT_VERSION};
pub use stats::CacheStatistics;
pub use tracker::{AccessEvent, EventType};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;
