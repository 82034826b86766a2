//! Snapshot aggregation and caching

use crate::ab::{significance, variant_stats, AbTestResult, VariantStats};
use crate::fields::{field_analysis, FieldAnalysis};
use crate::funnel::{funnel, FunnelStep};
use crate::overview::{overview, Overview};
use crate::range::TimeRange;
use crate::trends::{trends, Trends};
use crate::AnalyticsConfig;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use formkit_core::ports::{SubmissionQuery, SubmissionRepository};
use formkit_core::{Clock, Form, PortResult, Submission, SystemClock};
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Every analysis of one form over one time range
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    /// Form analysed
    pub form_id: String,
    /// Window the submissions were filtered to
    pub time_range: TimeRange,
    /// When the snapshot was computed
    pub generated_at: DateTime<Utc>,
    /// Submissions inside the range
    pub submission_count: u64,
    /// Headline totals and rates
    pub overview: Overview,
    /// Daily counts
    pub trends: Trends,
    /// Per-field statistics in field order
    pub field_analysis: Vec<FieldAnalysis>,
    /// Completion of each field in field order
    pub conversion_funnel: Vec<FunnelStep>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct SnapshotKey {
    form_id: String,
    range: TimeRange,
    submission_count: usize,
}

/// Aggregator counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregatorStats {
    /// Snapshots computed from scratch
    pub snapshots_computed: u64,
    /// Snapshots served from the cache
    pub cache_hits: u64,
    /// Sections that panicked and fell back to defaults
    pub failed_sections: u64,
}

/// Computes analytics snapshots and caches them per submission count
pub struct AnalyticsAggregator {
    config: AnalyticsConfig,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    snapshots: Cache<SnapshotKey, Arc<AnalyticsSnapshot>>,
    computed: AtomicU64,
    cache_hits: AtomicU64,
    failed_sections: AtomicU64,
}

impl AnalyticsAggregator {
    /// Aggregator with an injected clock
    pub fn new(config: AnalyticsConfig, clock: Arc<dyn Clock>) -> Self {
        let offset = FixedOffset::east_opt(config.utc_offset_minutes * 60).unwrap_or_else(|| {
            tracing::warn!(minutes = config.utc_offset_minutes, "invalid UTC offset, using UTC");
            Utc.fix()
        });
        let snapshots = Cache::builder()
            .max_capacity(config.snapshot_capacity)
            .time_to_live(Duration::from_secs(config.snapshot_ttl_secs))
            .build();
        Self {
            config,
            clock,
            offset,
            snapshots,
            computed: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            failed_sections: AtomicU64::new(0),
        }
    }

    /// Aggregator on the system clock
    pub fn with_system_clock(config: AnalyticsConfig) -> Self {
        Self::new(config, Arc::new(SystemClock))
    }

    /// Active configuration
    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Cached snapshot; a changed submission count yields a new cache key
    pub fn snapshot(&self, form: &Form, submissions: &[Submission], range: TimeRange) -> Arc<AnalyticsSnapshot> {
        let key = SnapshotKey {
            form_id: form.id.clone(),
            range,
            submission_count: submissions.len(),
        };
        if let Some(hit) = self.snapshots.get(&key) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(form = %form.id, %range, "analytics snapshot cache hit");
            return hit;
        }
        let snapshot = Arc::new(self.compute(form, submissions, range));
        self.snapshots.insert(key, snapshot.clone());
        snapshot
    }

    /// Load the range's submissions from `repository` and build a cached snapshot
    pub async fn snapshot_from(
        &self,
        repository: &dyn SubmissionRepository,
        form: &Form,
        range: TimeRange,
    ) -> PortResult<Arc<AnalyticsSnapshot>> {
        let query = SubmissionQuery {
            since: range.cutoff(self.clock.now()),
            ..Default::default()
        };
        let submissions = repository.get_submissions(&form.id, query).await?;
        Ok(self.snapshot(form, &submissions, range))
    }

    /// Uncached snapshot. Each section degrades to its empty value if it fails.
    pub fn compute(&self, form: &Form, submissions: &[Submission], range: TimeRange) -> AnalyticsSnapshot {
        let now = self.clock.now();
        let in_range = range.filter(submissions, now);
        self.computed.fetch_add(1, Ordering::Relaxed);

        AnalyticsSnapshot {
            form_id: form.id.clone(),
            time_range: range,
            generated_at: now,
            submission_count: in_range.len() as u64,
            overview: self.guarded("overview", &form.id, || overview(form, &in_range, None, &self.config)),
            trends: self.guarded("trends", &form.id, || trends(&in_range, self.offset)),
            field_analysis: self.guarded("fields", &form.id, || field_analysis(form, &in_range)),
            conversion_funnel: self.guarded("funnel", &form.id, || funnel(form, &in_range)),
        }
    }

    /// Overview with a known view count
    pub fn overview_with_views(&self, form: &Form, submissions: &[Submission], range: TimeRange, views: u64) -> Overview {
        let in_range = range.filter(submissions, self.clock.now());
        self.guarded("overview", &form.id, || overview(form, &in_range, Some(views), &self.config))
    }

    /// Significance test over raw counts
    pub fn ab_test(&self, control: &VariantStats, treatment: &VariantStats) -> AbTestResult {
        significance(control, treatment, &self.config)
    }

    /// Compare two variants recorded on the submissions; `None` if either has no traffic
    pub fn variant_test(
        &self,
        form: &Form,
        submissions: &[Submission],
        range: TimeRange,
        control: &str,
        treatment: &str,
    ) -> Option<AbTestResult> {
        let in_range = range.filter(submissions, self.clock.now());
        let stats = self.guarded("variants", &form.id, || variant_stats(form, &in_range));
        let find = |name: &str| stats.iter().find(|s| s.name == name);
        Some(self.ab_test(find(control)?, find(treatment)?))
    }

    /// Drop every cached snapshot
    pub fn clear(&self) {
        self.snapshots.invalidate_all();
    }

    /// Counter snapshot
    pub fn stats(&self) -> AggregatorStats {
        AggregatorStats {
            snapshots_computed: self.computed.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            failed_sections: self.failed_sections.load(Ordering::Relaxed),
        }
    }

    fn guarded<T: Default>(&self, section: &str, form_id: &str, compute: impl FnOnce() -> T) -> T {
        match catch_unwind(AssertUnwindSafe(compute)) {
            Ok(value) => value,
            Err(_) => {
                self.failed_sections.fetch_add(1, Ordering::Relaxed);
                tracing::error!(form = %form_id, section, "analytics section failed, using empty result");
                T::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use formkit_core::memory::InMemoryStore;
    use formkit_core::{FieldDefinition, FieldType, ManualClock, Values};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn aggregator() -> AnalyticsAggregator {
        AnalyticsAggregator::new(AnalyticsConfig::default(), Arc::new(ManualClock::new(now())))
    }

    fn form() -> Form {
        let mut form = Form::with_id("signup", "Signup");
        form.add_field(FieldDefinition::new("name", FieldType::Text, "Name")).unwrap();
        form.add_field(FieldDefinition::new("email", FieldType::Email, "Email")).unwrap();
        form
    }

    fn submissions(form: &Form, count: usize, days_ago: i64) -> Vec<Submission> {
        (0..count)
            .map(|i| {
                let mut data: Values = [("name".to_string(), json!(format!("user {}", i)))].into_iter().collect();
                if i % 5 != 0 {
                    data.insert("email".into(), json!(format!("u{}@example.com", i)));
                }
                Submission::for_form(form, data, now() - ChronoDuration::days(days_ago))
            })
            .collect()
    }

    #[test]
    fn test_snapshot_sections() {
        let form = form();
        let mut subs = submissions(&form, 100, 1);
        subs.extend(submissions(&form, 10, 45));

        let snapshot = aggregator().compute(&form, &subs, TimeRange::Month);
        assert_eq!(snapshot.submission_count, 100);
        assert_eq!(snapshot.overview.estimated_views, 150);
        assert!((snapshot.field_analysis[1].completion_rate - 80.0).abs() < 1e-9);
        assert_eq!(snapshot.conversion_funnel[1].completed, 80);
        assert!((snapshot.conversion_funnel[1].drop_off_rate - 20.0).abs() < 1e-9);
        assert_eq!(snapshot.trends.points.len(), 1);

        let all = aggregator().compute(&form, &subs, TimeRange::All);
        assert_eq!(all.submission_count, 110);
    }

    #[test]
    fn test_snapshot_cache_keyed_by_submission_count() {
        let agg = aggregator();
        let form = form();
        let mut subs = submissions(&form, 20, 0);

        let first = agg.snapshot(&form, &subs, TimeRange::Week);
        let second = agg.snapshot(&form, &subs, TimeRange::Week);
        assert!(Arc::ptr_eq(&first, &second));

        subs.extend(submissions(&form, 1, 0));
        let third = agg.snapshot(&form, &subs, TimeRange::Week);
        assert_eq!(third.submission_count, 21);

        let stats = agg.stats();
        assert_eq!(stats.snapshots_computed, 2);
        assert_eq!(stats.cache_hits, 1);
    }

    #[test]
    fn test_failed_section_degrades_to_default() {
        let agg = aggregator();
        let trends: Trends = agg.guarded("trends", "f", || panic!("bad timestamp"));
        assert_eq!(trends, Trends::default());
        assert_eq!(agg.stats().failed_sections, 1);
    }

    #[test]
    fn test_variant_test() {
        let agg = aggregator();
        let form = form();
        let mut subs = Vec::new();
        for (i, s) in submissions(&form, 100, 0).into_iter().enumerate() {
            subs.push(s.with_variant(if i % 2 == 0 { "A" } else { "B" }));
        }
        let result = agg.variant_test(&form, &subs, TimeRange::All, "A", "B").unwrap();
        assert_eq!(result.control.visitors, 50);
        assert_eq!(result.treatment.visitors, 50);
        assert!(agg.variant_test(&form, &subs, TimeRange::All, "A", "C").is_none());
    }

    #[tokio::test]
    async fn test_snapshot_from_repository() {
        let form = form();
        let store = InMemoryStore::new();
        for s in submissions(&form, 3, 2).into_iter().chain(submissions(&form, 2, 40)) {
            store.insert_submission(s);
        }
        let snapshot = aggregator().snapshot_from(&store, &form, TimeRange::Month).await.unwrap();
        assert_eq!(snapshot.submission_count, 3);
    }
}
