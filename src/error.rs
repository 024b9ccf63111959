//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine.
///
/// Eviction and expiry are normal control flow and never surface here.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key absent or expired on an operation that requires it to exist
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Snapshot carries a version this engine cannot read
    #[error("Unsupported snapshot version: {0}")]
    UnsupportedVersion(String),

    /// An injected collaborator (compressor, optimization hint, analyzer) failed
    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: &'static str,
        message: String,
    },

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalidation pattern is not a valid regular expression
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Payload could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CacheError {
    /// Wraps a collaborator failure message.
    pub fn collaborator(collaborator: &'static str, message: impl Into<String>) -> Self {
        CacheError::Collaborator {
            collaborator,
            message: message.into(),
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
