//! Adaptive Cache - an in-memory cache engine
//!
//! Keyed JSON values with lazy TTL expiry, LRU eviction with priority
//! exemption, size-triggered compression, sequence-based prefetch, batch
//! operations and versioned snapshots.

pub mod cache;
pub mod config;
pub mod driver;
pub mod error;
pub mod models;
pub mod tasks;

pub use cache::{AdaptiveCache, CacheBuilder};
pub use config::{CacheOptions, Config};
pub use error::{CacheError, Result};
pub use tasks::{spawn_prefetch_task, PrefetchDispatch};
