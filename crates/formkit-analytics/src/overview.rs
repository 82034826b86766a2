//! Headline numbers for a form

use crate::AnalyticsConfig;
use formkit_core::submission::completion_percentage;
use formkit_core::{Form, Submission};
use serde::{Deserialize, Serialize};

/// Totals and rates over a submission set
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    /// Submissions in range
    pub total_submissions: u64,
    /// Supplied view count, or an estimate from the submission count
    pub estimated_views: u64,
    /// Submissions per view, percent
    pub conversion_rate: f64,
    /// Mean share of fields answered, percent
    pub completion_rate: f64,
    /// Mean seconds from open to submit
    pub average_completion_secs: f64,
    /// Median seconds from open to submit
    pub median_completion_secs: f64,
    /// Share of submissions below the bounce threshold, percent
    pub bounce_rate: f64,
}

/// Compute the overview; `views` overrides the estimate when known
pub fn overview(form: &Form, submissions: &[&Submission], views: Option<u64>, config: &AnalyticsConfig) -> Overview {
    let total = submissions.len() as u64;
    let estimated_views = views.unwrap_or_else(|| (total as f64 * config.view_multiplier).ceil() as u64);

    let completions: Vec<f64> = submissions
        .iter()
        .map(|s| completion_percentage(form, &s.data))
        .collect();
    let bounced = completions.iter().filter(|c| **c < config.bounce_threshold).count();

    let mut times: Vec<f64> = submissions
        .iter()
        .filter_map(|s| s.metadata.completion_time_secs)
        .filter(|t| t.is_finite())
        .collect();
    times.sort_by(f64::total_cmp);

    Overview {
        total_submissions: total,
        estimated_views,
        conversion_rate: percent(total as f64, estimated_views as f64),
        completion_rate: mean(&completions),
        average_completion_secs: mean(&times),
        median_completion_secs: median(&times),
        bounce_rate: percent(bounced as f64, total as f64),
    }
}

pub(crate) fn percent(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 {
        0.0
    } else {
        part / whole * 100.0
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Median of sorted values
fn median(sorted: &[f64]) -> f64 {
    match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[n / 2],
        n => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use formkit_core::{FieldDefinition, FieldType, Values};
    use serde_json::json;

    fn form() -> Form {
        let mut form = Form::with_id("f", "Survey");
        for id in ["a", "b", "c", "d"] {
            form.add_field(FieldDefinition::new(id, FieldType::Text, id)).unwrap();
        }
        form
    }

    fn submission(form: &Form, answered: &[&str], secs: i64) -> Submission {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let data: Values = answered.iter().map(|id| (id.to_string(), json!("x"))).collect();
        Submission::for_form(form, data, now).started_at(now - Duration::seconds(secs))
    }

    #[test]
    fn test_overview() {
        let form = form();
        let subs = vec![
            submission(&form, &["a", "b", "c", "d"], 60),
            submission(&form, &["a", "b"], 120),
            submission(&form, &[], 30),
        ];
        let refs: Vec<_> = subs.iter().collect();
        let o = overview(&form, &refs, None, &AnalyticsConfig::default());

        assert_eq!(o.total_submissions, 3);
        assert_eq!(o.estimated_views, 5);
        assert!((o.conversion_rate - 60.0).abs() < 1e-9);
        assert!((o.completion_rate - 50.0).abs() < 1e-9);
        assert!((o.average_completion_secs - 70.0).abs() < 1e-9);
        assert!((o.median_completion_secs - 60.0).abs() < 1e-9);
        assert!((o.bounce_rate - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_supplied_views_and_empty_set() {
        let form = form();
        let empty = overview(&form, &[], Some(0), &AnalyticsConfig::default());
        assert_eq!(empty, Overview::default());

        let subs = vec![submission(&form, &["a"], 10)];
        let refs: Vec<_> = subs.iter().collect();
        let o = overview(&form, &refs, Some(4), &AnalyticsConfig::default());
        assert_eq!(o.estimated_views, 4);
        assert!((o.conversion_rate - 25.0).abs() < 1e-9);
    }
}
