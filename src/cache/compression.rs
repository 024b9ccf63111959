//! Compression Policy Module
//!
//! Decides whether a value is compressed before storage. The byte transform
//! itself lives behind the [`Compressor`] trait.

use serde_json::Value;

use crate::error::{CacheError, Result};

/// Values whose serialized size exceeds this many bytes are eligible
pub const COMPRESSION_THRESHOLD_BYTES: usize = 1024;

// == Compressor Trait ==
/// Output of a compressor run.
#[derive(Debug, Clone, PartialEq)]
pub struct Compressed {
    pub data: Vec<u8>,
    /// Compressed size over original size
    pub ratio: f64,
}

/// Byte-level codec used for stored and exported payloads.
pub trait Compressor: Send + Sync {
    fn compress(&self, data: &[u8]) -> Result<Compressed>;

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

// == Zstd Compressor ==
#[derive(Debug, Clone, Copy)]
pub struct ZstdCompressor {
    level: i32,
}

impl ZstdCompressor {
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

impl Default for ZstdCompressor {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_ZSTD_LEVEL)
    }
}

impl Compressor for ZstdCompressor {
    fn compress(&self, data: &[u8]) -> Result<Compressed> {
        let compressed = zstd::encode_all(data, self.level)
            .map_err(|e| CacheError::collaborator("compressor", e.to_string()))?;
        let ratio = if data.is_empty() {
            1.0
        } else {
            compressed.len() as f64 / data.len() as f64
        };
        Ok(Compressed {
            data: compressed,
            ratio,
        })
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        zstd::decode_all(data).map_err(|e| CacheError::collaborator("compressor", e.to_string()))
    }
}

// == Policy ==
/// Estimated serialized size of a value in bytes.
pub fn estimate_size(value: &Value) -> usize {
    serde_json::to_vec(value).map(|bytes| bytes.len()).unwrap_or(0)
}

/// Returns true if a value of `size_bytes` should be handed to the compressor.
pub fn should_compress(size_bytes: usize, enabled: bool) -> bool {
    enabled && size_bytes > COMPRESSION_THRESHOLD_BYTES
}

/// Returns true if compressor output is worth keeping over the raw form.
pub fn is_worthwhile(compressed: &Compressed) -> bool {
    compressed.ratio > 0.0 && compressed.ratio < 1.0
}
