//! formkit analytics
//!
//! Pure computations over a form's submissions, plus a snapshot cache.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Analytics Aggregator                     │
//! │                                                          │
//! │   submissions ──► TimeRange filter ──┬──► Overview       │
//! │                                      ├──► Trends         │
//! │                                      ├──► Field analysis │
//! │                                      └──► Funnel         │
//! │                                                          │
//! │   ┌───────────────────────────┐    ┌──────────────────┐  │
//! │   │ Snapshot cache (TTL)      │    │  A/B z-test      │  │
//! │   │ (form, range, count)      │    │                  │  │
//! │   └───────────────────────────┘    └──────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod ab;
pub mod aggregator;
pub mod fields;
pub mod funnel;
pub mod overview;
pub mod range;
pub mod trends;

pub use ab::{significance, variant_stats, AbTestResult, VariantStats};
pub use aggregator::{AggregatorStats, AnalyticsAggregator, AnalyticsSnapshot};
pub use fields::FieldAnalysis;
pub use funnel::FunnelStep;
pub use overview::Overview;
pub use range::{ParseTimeRangeError, TimeRange};
pub use trends::{TrendPoint, Trends};

use serde::{Deserialize, Serialize};

/// Analytics configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Views estimated per submission when no view count is known
    pub view_multiplier: f64,
    /// Completion percentage below which a submission counts as a bounce
    pub bounce_threshold: f64,
    /// Offset from UTC used to assign submissions to calendar days
    pub utc_offset_minutes: i32,
    /// Lifetime of cached snapshots
    pub snapshot_ttl_secs: u64,
    /// Maximum cached snapshots
    pub snapshot_capacity: u64,
    /// Minimum visitors per variant for an A/B test
    pub min_sample_size: u64,
    /// Confidence (percent) at which a difference is significant
    pub confidence_level: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            view_multiplier: 1.5,
            bounce_threshold: 25.0,
            utc_offset_minutes: 0,
            snapshot_ttl_secs: 300,
            snapshot_capacity: 1_000,
            min_sample_size: 30,
            confidence_level: 95.0,
        }
    }
}
