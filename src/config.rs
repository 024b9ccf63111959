//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default maximum number of entries
pub const DEFAULT_MAX_SIZE: usize = 1000;

/// Default TTL in milliseconds (5 minutes)
pub const DEFAULT_TTL_MS: u64 = 300_000;

/// Default zstd compression level
pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

// == Eviction Policy ==
/// Capacity eviction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Least recently used, skipping high-priority entries
    #[default]
    Lru,
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lru" => Ok(EvictionPolicy::Lru),
            other => Err(format!("unknown eviction policy '{}'", other)),
        }
    }
}

// == Cache Options ==
/// Engine-level options. Embedded verbatim in exported snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    /// Maximum number of entries before LRU eviction kicks in
    pub max_size: usize,
    /// Default TTL in milliseconds for entries without explicit TTL
    pub ttl_ms: u64,
    /// Capacity eviction strategy
    pub eviction_policy: EvictionPolicy,
    /// Compress values larger than the compression threshold
    pub compression_enabled: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            ttl_ms: DEFAULT_TTL_MS,
            eviction_policy: EvictionPolicy::Lru,
            compression_enabled: true,
        }
    }
}

// == Config ==
/// Process configuration: cache options plus collaborator settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Options handed to the cache engine
    pub cache: CacheOptions,
    /// Level used by the default zstd compressor
    pub zstd_level: i32,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_SIZE` - Maximum cache entries (default: 1000)
    /// - `CACHE_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `CACHE_EVICTION_POLICY` - Eviction policy (default: lru)
    /// - `CACHE_COMPRESSION_ENABLED` - Enable compression (default: true)
    /// - `CACHE_ZSTD_LEVEL` - zstd level for the default compressor (default: 3)
    pub fn from_env() -> Self {
        Self {
            cache: CacheOptions {
                max_size: parse_env("CACHE_MAX_SIZE").unwrap_or(DEFAULT_MAX_SIZE),
                ttl_ms: parse_env("CACHE_TTL_MS")
                    .filter(|ttl| *ttl > 0)
                    .unwrap_or(DEFAULT_TTL_MS),
                eviction_policy: parse_env("CACHE_EVICTION_POLICY").unwrap_or_default(),
                compression_enabled: parse_env("CACHE_COMPRESSION_ENABLED").unwrap_or(true),
            },
            zstd_level: parse_env("CACHE_ZSTD_LEVEL").unwrap_or(DEFAULT_ZSTD_LEVEL),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheOptions::default(),
            zstd_level: DEFAULT_ZSTD_LEVEL,
        }
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
