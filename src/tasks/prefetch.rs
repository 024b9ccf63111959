//! Prefetch Task
//!
//! Runs the prefetch advisor off the caller's path after a cache hit.

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::{AdaptiveCache, Prediction};

/// Where a prefetch request ended up.
#[derive(Debug)]
pub enum PrefetchDispatch {
    /// Nothing to load: cold key, no loader, or every follower already cached
    Skipped,
    /// Running on the tokio blocking pool
    Task(JoinHandle<()>),
    /// Running on a detached thread (no tokio runtime present)
    Thread,
}

/// Spawns a detached prefetch for `key` when there is something to warm.
///
/// Predictions are computed on the caller's thread; only keys that still need
/// loading are handed off. Inside a tokio runtime the load runs on the
/// blocking pool, since [`crate::cache::ValueLoader::load`] may do I/O.
/// Outside one it runs on a short-lived thread. Either way failures stay
/// inside the spawned work.
///
/// # Example
/// ```ignore
/// let dispatch = spawn_prefetch_task(cache.clone(), "user:1".to_string());
/// ```
pub fn spawn_prefetch_task(cache: AdaptiveCache, key: String) -> PrefetchDispatch {
    let predictions = cache.pending_predictions(&key);
    if predictions.is_empty() {
        return PrefetchDispatch::Skipped;
    }

    match Handle::try_current() {
        Ok(handle) => PrefetchDispatch::Task(
            handle.spawn_blocking(move || run_prefetch(&cache, &key, predictions)),
        ),
        Err(_) => {
            let spawned = std::thread::Builder::new()
                .name("cache-prefetch".to_string())
                .spawn(move || run_prefetch(&cache, &key, predictions));
            match spawned {
                Ok(_) => PrefetchDispatch::Thread,
                Err(e) => {
                    warn!(error = %e, "failed to spawn prefetch thread");
                    PrefetchDispatch::Skipped
                }
            }
        }
    }
}

fn run_prefetch(cache: &AdaptiveCache, key: &str, predictions: Vec<Prediction>) {
    let outcome = cache.load_and_warm(predictions);
    if outcome.warmed > 0 {
        debug!(key, warmed = outcome.warmed, keys = ?outcome.keys, "prefetch warmed keys");
    }
}
