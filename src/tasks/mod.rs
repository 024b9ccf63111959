//! Background Tasks Module
//!
//! Contains work the cache runs off the caller's path.
//!
//! # Tasks
//! - Prefetch: warms keys predicted to follow a cache hit
//!
//! There is no expiry sweep; expiry happens on read.

mod prefetch;

pub use prefetch::{spawn_prefetch_task, PrefetchDispatch};
