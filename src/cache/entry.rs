//! Cache Entry Module
//!
//! Defines the structure for individual cache entries and their metadata.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Priority ==
/// Eviction priority of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    /// Exempt from LRU eviction, still subject to TTL expiry
    High,
    /// Inserted speculatively by the prefetch advisor
    Predicted,
}

// == Stored Value ==
/// Payload as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "encoding", content = "data", rename_all = "lowercase")]
pub enum StoredValue {
    /// Uncompressed JSON value
    Raw(Value),
    /// Compressor output over the JSON-serialized value
    Compressed(Vec<u8>),
}

impl StoredValue {
    pub fn is_compressed(&self) -> bool {
        matches!(self, StoredValue::Compressed(_))
    }
}

// == Entry Metadata ==
/// Everything the store knows about an entry except its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub key: String,
    /// Estimated size of the stored form in bytes
    pub size_bytes: usize,
    pub compressed: bool,
    /// Compressed size over original size, 1.0 when uncompressed
    pub compression_ratio: f64,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), always after `created_at`
    pub expires_at: u64,
    /// Last hit or write (Unix milliseconds)
    pub last_accessed: u64,
    pub access_count: u64,
    pub priority: Priority,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl EntryMetadata {
    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is expired once `now >= expires_at`.
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self, now: u64) -> u64 {
        self.expires_at.saturating_sub(now)
    }

    /// Checks whether the entry carries any of the given tags.
    pub fn has_any_tag<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        tags.iter().any(|tag| self.tags.contains(tag.as_ref()))
    }
}

// == Cache Entry ==
/// A stored payload together with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub metadata: EntryMetadata,
    pub value: StoredValue,
}

impl CacheEntry {
    pub fn key(&self) -> &str {
        &self.metadata.key
    }

    pub fn is_expired(&self, now: u64) -> bool {
        self.metadata.is_expired(now)
    }
}

// == Set Options ==
/// Per-write options. Unset fields fall back to the engine defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetOptions {
    /// Time to live; defaults to `CacheOptions::ttl_ms`
    #[serde(with = "optional_millis")]
    pub ttl: Option<Duration>,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<String>>,
    /// Overrides `CacheOptions::compression_enabled` for this write
    pub compress: Option<bool>,
}

impl SetOptions {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = Some(compress);
        self
    }

    /// Fills every unset field of `self` from `base`.
    pub fn merged_over(&self, base: &SetOptions) -> SetOptions {
        SetOptions {
            ttl: self.ttl.or(base.ttl),
            priority: self.priority.or(base.priority),
            tags: self.tags.clone().or_else(|| base.tags.clone()),
            compress: self.compress.or(base.compress),
        }
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// TTLs travel as integer milliseconds.
mod optional_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ttl: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match ttl {
            Some(ttl) => s.serialize_some(&super::duration_ms(*ttl)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
