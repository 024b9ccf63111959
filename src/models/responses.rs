//! Reply DTOs for the line-oriented driver
//!
//! Every command produces exactly one JSON reply line tagged by `kind`.

use serde::Serialize;
use serde_json::Value;

use crate::cache::{
    CacheStatistics, ClearOutcome, EntryMetadata, ImportOutcome, MGetOutcome, PatternAnalysis,
    Snapshot,
};
use crate::error::CacheError;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    Stored {
        metadata: EntryMetadata,
    },
    StoredMany {
        metadata: Vec<EntryMetadata>,
    },
    Hit {
        key: String,
        value: Value,
        metadata: EntryMetadata,
        ttl_remaining_ms: u64,
    },
    Miss {
        key: String,
    },
    Deleted {
        key: String,
        deleted: bool,
    },
    Batch(MGetOutcome),
    ClearedAll {
        cleared: usize,
    },
    Cleared(ClearOutcome),
    Stats(CacheStatistics),
    Snapshot(Snapshot),
    Imported(ImportOutcome),
    Analysis(PatternAnalysis),
    Error {
        error: String,
    },
}

impl Reply {
    /// Creates an error reply from any displayable error.
    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error {
            error: message.into(),
        }
    }
}

impl From<CacheError> for Reply {
    fn from(err: CacheError) -> Self {
        Reply::error(err.to_string())
    }
}
