//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check capacity, expiry, LRU ordering and statistics
//! properties against arbitrary operation sequences.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{
    AdaptiveCache, ExportOptions, GetOptions, ManualClock, Priority, SetOptions,
};
use crate::config::CacheOptions;

// == Test Configuration ==
const TEST_MAX_SIZE: usize = 100;

const QUIET: GetOptions = GetOptions {
    prefetch: false,
    extend_ttl: false,
};

fn cache_with(max_size: usize, clock: Arc<ManualClock>) -> AdaptiveCache {
    let options = CacheOptions {
        max_size,
        ..CacheOptions::default()
    };
    AdaptiveCache::builder(options).clock(clock).build().unwrap()
}

// == Strategies ==
/// Generates valid cache keys (non-empty, within length limit)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,64}".prop_map(|s| s)
}

/// Generates JSON values, some large enough to be compressed
fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-zA-Z0-9 ]{1,256}".prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        ("[a-z]{1,8}", 200usize..600).prop_map(|(s, n)| Value::from(s.repeat(n))),
    ]
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Value },
    Get { key: String },
    Delete { key: String },
    Tick { ms: u64 },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    // Small key space so operations collide
    let key = "[a-e]{1,2}";
    prop_oneof![
        (key, value_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        key.prop_map(|key| CacheOp::Get { key }),
        key.prop_map(|key| CacheOp::Delete { key }),
        (1u64..500).prop_map(|ms| CacheOp::Tick { ms }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Statistics Accuracy: hits and misses reported by the cache match what
    // the caller observed, and hit rate stays within [0, 1].
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let clock = Arc::new(ManualClock::new(0));
        let cache = cache_with(8, clock.clone());
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    let options = SetOptions::default().with_ttl(Duration::from_millis(1_000));
                    cache.set(&key, value, &options).unwrap();
                }
                CacheOp::Get { key } => match cache.get_with(&key, QUIET).unwrap() {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Delete { key } => {
                    cache.delete(&key);
                }
                CacheOp::Tick { ms } => clock.advance(ms),
            }

            let stats = cache.statistics();
            prop_assert!((0.0..=1.0).contains(&stats.hit_rate));
        }

        let stats = cache.statistics();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.size, cache.len(), "Size mismatch");
    }

    // Round-trip Storage: any value read back before expiry equals the value
    // written, whether or not it was compressed.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), value in value_strategy()) {
        let cache = cache_with(TEST_MAX_SIZE, Arc::new(ManualClock::new(0)));

        cache.set(&key, value.clone(), &SetOptions::default()).unwrap();

        let hit = cache.get_with(&key, QUIET).unwrap().unwrap();
        prop_assert_eq!(hit.value, value, "Round-trip value mismatch");
    }

    // Capacity Invariant: with no high-priority entries the store never
    // exceeds max_size after a set returns.
    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec((valid_key_strategy(), value_strategy()), 1..200)
    ) {
        let max_size = 50;
        let clock = Arc::new(ManualClock::new(0));
        let cache = cache_with(max_size, clock.clone());

        for (key, value) in entries {
            cache.set(&key, value, &SetOptions::default()).unwrap();
            clock.advance(1);
            prop_assert!(
                cache.len() <= max_size,
                "Cache size {} exceeds max {}",
                cache.len(),
                max_size
            );
        }
    }

    // TTL Monotonicity: a read strictly before expiry hits, a read at or after
    // expiry misses and removes the entry.
    #[test]
    fn prop_ttl_monotonicity(
        key in valid_key_strategy(),
        ttl_ms in 1u64..10_000,
        before in 0u64..10_000,
    ) {
        let clock = Arc::new(ManualClock::new(1_000));
        let cache = cache_with(TEST_MAX_SIZE, clock.clone());
        let options = SetOptions::default().with_ttl(Duration::from_millis(ttl_ms));
        cache.set(&key, json!("v"), &options).unwrap();

        let offset = before % ttl_ms;
        clock.advance(offset);
        prop_assert!(cache.get_with(&key, QUIET).unwrap().is_some());

        clock.advance(ttl_ms - offset);
        prop_assert!(cache.get_with(&key, QUIET).unwrap().is_none());
        prop_assert!(cache.get_with(&key, QUIET).unwrap().is_none());
        prop_assert_eq!(cache.len(), 0);
        prop_assert_eq!(cache.statistics().evictions, 1);
    }
}

// Property tests for LRU eviction behavior
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // LRU Access Tracking: after filling to capacity and reading the oldest
    // entry, the next insert evicts the second oldest instead.
    #[test]
    fn prop_lru_access_tracking(
        keys in prop::collection::vec(valid_key_strategy(), 3..8),
        new_key in valid_key_strategy(),
    ) {
        let unique_keys: Vec<String> = keys
            .into_iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        prop_assume!(unique_keys.len() >= 3);
        prop_assume!(!unique_keys.contains(&new_key));

        let clock = Arc::new(ManualClock::new(0));
        let cache = cache_with(unique_keys.len(), clock.clone());
        for key in &unique_keys {
            cache.set(key, json!(key), &SetOptions::default()).unwrap();
            clock.advance(1);
        }

        let accessed_key = &unique_keys[0];
        cache.get_with(accessed_key, QUIET).unwrap();
        clock.advance(1);

        cache.set(&new_key, json!("new"), &SetOptions::default()).unwrap();

        prop_assert!(cache.contains(accessed_key), "Accessed key should survive");
        prop_assert!(!cache.contains(&unique_keys[1]), "Second oldest should be evicted");
        prop_assert!(cache.contains(&new_key));
    }

    // LRU Tie-break: with identical timestamps the earliest insertion goes first.
    #[test]
    fn prop_lru_tie_break_by_insertion(
        keys in prop::collection::vec(valid_key_strategy(), 2..10),
        new_key in valid_key_strategy(),
    ) {
        let mut seen = HashSet::new();
        let unique_keys: Vec<String> = keys.into_iter().filter(|k| seen.insert(k.clone())).collect();
        prop_assume!(unique_keys.len() >= 2);
        prop_assume!(!unique_keys.contains(&new_key));

        // Clock never moves: every entry shares last_accessed and created_at
        let cache = cache_with(unique_keys.len(), Arc::new(ManualClock::new(42)));
        for key in &unique_keys {
            cache.set(key, json!(1), &SetOptions::default()).unwrap();
        }
        cache.set(&new_key, json!(2), &SetOptions::default()).unwrap();

        prop_assert!(!cache.contains(&unique_keys[0]));
        for key in unique_keys.iter().skip(1) {
            prop_assert!(cache.contains(key));
        }
    }

    // Priority Exemption: a high-priority entry is never the LRU victim.
    #[test]
    fn prop_priority_exemption(
        fillers in prop::collection::vec(valid_key_strategy(), 1..20),
        extra in prop::collection::vec(valid_key_strategy(), 1..20),
    ) {
        let clock = Arc::new(ManualClock::new(0));
        let cache = cache_with(5, clock.clone());
        let high = SetOptions::default().with_priority(Priority::High);
        cache.set("pinned", json!("keep"), &high).unwrap();

        for key in fillers.iter().chain(extra.iter()) {
            clock.advance(1);
            cache.set(&format!("n_{}", key), json!(1), &SetOptions::default()).unwrap();
        }

        prop_assert!(cache.contains("pinned"));
        prop_assert!(cache.len() <= 5);
    }

    // Snapshot Round-trip: importing an export reproduces keys and values.
    #[test]
    fn prop_snapshot_roundtrip(
        entries in prop::collection::vec((valid_key_strategy(), value_strategy()), 1..30),
        compress in any::<bool>(),
    ) {
        let clock = Arc::new(ManualClock::new(0));
        let source = cache_with(TEST_MAX_SIZE, clock.clone());
        for (key, value) in &entries {
            source.set(key, value.clone(), &SetOptions::default()).unwrap();
        }

        let snapshot = source.export_snapshot(ExportOptions { include_data: true, compress });
        let json = snapshot.to_json().unwrap();
        let parsed = crate::cache::Snapshot::from_json(&json).unwrap();

        let target = cache_with(TEST_MAX_SIZE, clock);
        let outcome = target.import_snapshot(parsed).unwrap();
        prop_assert_eq!(outcome.imported, source.len());
        prop_assert_eq!(target.len(), source.len());

        for (key, _) in &entries {
            let original = source.get_with(key, QUIET).unwrap().unwrap().value;
            let restored = target.get_with(key, QUIET).unwrap().unwrap().value;
            prop_assert_eq!(original, restored);
        }
    }
}
