//! Pattern Analysis Module
//!
//! Advisory analytics over the access log. Detection itself is delegated to
//! an optional [`PatternAnalyzer`]; this module only turns its report and the
//! current statistics into recommendations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::clock;
use crate::cache::engine::AdaptiveCache;
use crate::cache::stats::CacheStatistics;
use crate::cache::tracker::AccessEvent;
use crate::error::Result;

/// Number of most recent events handed to the analyzer
pub const ANALYSIS_WINDOW: usize = 1_000;

/// Hit rate below which a TTL increase is recommended
pub const LOW_HIT_RATE: f64 = 0.5;

/// Pattern kind that triggers a prefetching recommendation
pub const SEQUENTIAL_PATTERN: &str = "sequential";

// == Analyzer Types ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedPattern {
    /// e.g. "sequential", "periodic"
    pub kind: String,
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    #[serde(default)]
    pub patterns: Vec<DetectedPattern>,
    #[serde(default)]
    pub anomalies: Vec<String>,
}

/// External pattern-detection service.
pub trait PatternAnalyzer: Send + Sync {
    fn detect(&self, events: &[AccessEvent]) -> Result<PatternReport>;
}

// == Recommendations ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    TtlAdjustment,
    Prefetching,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub message: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternAnalysis {
    pub patterns: Vec<DetectedPattern>,
    pub anomalies: Vec<String>,
    pub recommendations: Vec<Recommendation>,
    pub stats: CacheStatistics,
    pub timestamp: DateTime<Utc>,
}

/// Builds recommendations from a detector report and current statistics.
pub fn recommend(report: &PatternReport, stats: &CacheStatistics) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if stats.hit_rate < LOW_HIT_RATE {
        recommendations.push(Recommendation {
            kind: RecommendationKind::TtlAdjustment,
            message: "Low hit rate detected".to_string(),
            suggestion: "Increase TTL to improve hit rate".to_string(),
        });
    }

    if report.patterns.iter().any(|p| p.kind == SEQUENTIAL_PATTERN) {
        recommendations.push(Recommendation {
            kind: RecommendationKind::Prefetching,
            message: "Sequential access pattern detected".to_string(),
            suggestion: "Enable aggressive prefetching".to_string(),
        });
    }

    recommendations
}

impl AdaptiveCache {
    // == Analyze Patterns ==
    /// Runs the analyzer over recent events. Analyzer failures are logged and
    /// produce an empty report.
    pub fn analyze_patterns(&self) -> PatternAnalysis {
        let events = self.access_history(ANALYSIS_WINDOW);

        let report = match &self.inner.analyzer {
            Some(analyzer) => analyzer.detect(&events).unwrap_or_else(|e| {
                warn!(error = %e, "pattern analyzer failed");
                PatternReport::default()
            }),
            None => PatternReport::default(),
        };

        let stats = self.statistics();
        let recommendations = recommend(&report, &stats);

        PatternAnalysis {
            patterns: report.patterns,
            anomalies: report.anomalies,
            recommendations,
            stats,
            timestamp: clock::to_datetime(self.now()),
        }
    }
}
