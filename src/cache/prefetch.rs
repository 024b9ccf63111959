//! Prefetch Advisor Module
//!
//! First-order "next key" predictor over the access log. Predictions are
//! turned into writes by `AdaptiveCache::warm_cache`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::tracker::AccessTracker;

/// Events for the hit key considered by the cold-start guard
pub const RECENT_WINDOW: usize = 10;

/// A key needs more than this many recent events before predictions are made
pub const MIN_RECENT_EVENTS: usize = 3;

/// Maximum predictions per hit
pub const MAX_PREDICTIONS: usize = 3;

/// Confidence assigned to every follow-key prediction
pub const FOLLOW_CONFIDENCE: f64 = 0.8;

/// Predictions at or below this confidence are never warmed
pub const WARM_CONFIDENCE_FLOOR: f64 = 0.7;

// == Value Loader ==
/// Resolves a concrete value for a predicted key, typically from the system
/// of record. Returning `None` skips the prediction.
pub trait ValueLoader: Send + Sync {
    fn load(&self, key: &str) -> Option<Value>;
}

// == Prediction ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub key: String,
    pub confidence: f64,
    /// Value to store; predictions without one are skipped when warming
    #[serde(default)]
    pub value: Option<Value>,
    /// Overrides the default TTL for the warmed entry
    #[serde(skip)]
    pub ttl: Option<Duration>,
}

impl Prediction {
    pub fn new(key: impl Into<String>, confidence: f64) -> Self {
        Self {
            key: key.into(),
            confidence,
            value: None,
            ttl: None,
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Returns true if the confidence clears the warm floor.
    pub fn is_confident(&self) -> bool {
        self.confidence > WARM_CONFIDENCE_FLOOR
    }
}

// == Warm Outcome ==
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WarmOutcome {
    pub warmed: usize,
    pub keys: Vec<String>,
}

// == Prefetch Advisor ==
#[derive(Debug, Default, Clone, Copy)]
pub struct PrefetchAdvisor;

impl PrefetchAdvisor {
    pub fn new() -> Self {
        Self
    }

    // == Predict ==
    /// Predicts keys likely to be requested after `key`.
    ///
    /// Returns nothing until `key` has more than three recent events. Each
    /// candidate is a key that immediately followed `key` somewhere in the
    /// log, in first-seen order.
    pub fn predict(&self, tracker: &AccessTracker, key: &str) -> Vec<Prediction> {
        if tracker.recent_by_key(key, RECENT_WINDOW).len() <= MIN_RECENT_EVENTS {
            return Vec::new();
        }

        let mut followers: Vec<&str> = Vec::new();
        let mut previous: Option<&str> = None;
        for event in tracker.iter() {
            let current = event.key.as_str();
            if previous == Some(key) && current != key && !followers.contains(&current) {
                followers.push(current);
            }
            previous = Some(current);
        }

        followers
            .into_iter()
            .take(MAX_PREDICTIONS)
            .map(|follower| Prediction::new(follower, FOLLOW_CONFIDENCE))
            .collect()
    }
}
