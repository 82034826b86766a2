//! A/B test significance
//!
//! Pooled two-proportion z-test. |z| is mapped to a two-sided confidence
//! through the normal CDF, using the Abramowitz-Stegun 7.1.26 approximation
//! of erf (absolute error below 1.5e-7).

use crate::AnalyticsConfig;
use formkit_core::submission::completion_percentage;
use formkit_core::{Form, Submission};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reason reported when either variant is too small
pub const INSUFFICIENT_SAMPLE: &str = "insufficient sample size";

/// Traffic and conversions of one variant
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantStats {
    /// Variant label
    pub name: String,
    /// Visitors shown the variant
    pub visitors: u64,
    /// Visitors who converted
    pub conversions: u64,
}

impl VariantStats {
    /// Stats for one variant
    pub fn new(name: impl Into<String>, visitors: u64, conversions: u64) -> Self {
        Self {
            name: name.into(),
            visitors,
            conversions,
        }
    }

    /// Conversion rate as a fraction. Zero without visitors.
    pub fn rate(&self) -> f64 {
        if self.visitors == 0 {
            0.0
        } else {
            self.conversions as f64 / self.visitors as f64
        }
    }
}

/// Two-proportion z-test of treatment against control
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbTestResult {
    /// Baseline variant
    pub control: VariantStats,
    /// Variant under test
    pub treatment: VariantStats,
    /// Conversion rates, percent
    pub control_rate: f64,
    /// Treatment conversion rate, percent
    pub treatment_rate: f64,
    /// Relative change of treatment over control, percent
    pub lift: f64,
    /// Pooled two-proportion z statistic
    pub z_score: f64,
    /// Two-sided confidence, percent
    pub confidence: f64,
    /// Confidence reached the configured threshold
    pub significant: bool,
    /// Set when the test could not be evaluated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Compare two variants
pub fn significance(control: &VariantStats, treatment: &VariantStats, config: &AnalyticsConfig) -> AbTestResult {
    let (p1, p2) = (control.rate(), treatment.rate());
    let mut result = AbTestResult {
        control: control.clone(),
        treatment: treatment.clone(),
        control_rate: p1 * 100.0,
        treatment_rate: p2 * 100.0,
        lift: if p1 > 0.0 { (p2 - p1) / p1 * 100.0 } else { 0.0 },
        z_score: 0.0,
        confidence: 0.0,
        significant: false,
        message: None,
    };

    if control.visitors < config.min_sample_size || treatment.visitors < config.min_sample_size {
        result.message = Some(INSUFFICIENT_SAMPLE.to_string());
        return result;
    }

    let (n1, n2) = (control.visitors as f64, treatment.visitors as f64);
    let pooled = (control.conversions + treatment.conversions) as f64 / (n1 + n2);
    let standard_error = (pooled * (1.0 - pooled) * (1.0 / n1 + 1.0 / n2)).sqrt();
    if standard_error > 0.0 {
        result.z_score = (p2 - p1) / standard_error;
        result.confidence = (2.0 * normal_cdf(result.z_score.abs()) - 1.0) * 100.0;
    }
    result.significant = result.confidence >= config.confidence_level;
    result
}

/// Visitors and conversions per `metadata.variant`, sorted by name.
///
/// A submission converts when it answers every field of the form.
pub fn variant_stats(form: &Form, submissions: &[&Submission]) -> Vec<VariantStats> {
    let mut by_name: BTreeMap<&str, VariantStats> = BTreeMap::new();
    for submission in submissions {
        let Some(name) = submission.metadata.variant.as_deref() else {
            continue;
        };
        let stats = by_name.entry(name).or_insert_with(|| VariantStats::new(name, 0, 0));
        stats.visitors += 1;
        if completion_percentage(form, &submission.data) >= 100.0 {
            stats.conversions += 1;
        }
    }
    by_name.into_values().collect()
}

/// Standard normal CDF
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Abramowitz-Stegun 7.1.26
pub fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();
    sign * y
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use formkit_core::{FieldDefinition, FieldType, Values};
    use serde_json::json;

    #[test]
    fn test_erf() {
        assert!(erf(0.0).abs() < 1e-7);
        assert!((erf(1.0) - 0.8427007929).abs() < 1e-6);
        assert!((erf(-1.0) + 0.8427007929).abs() < 1e-6);
        assert!((normal_cdf(1.96) - 0.975).abs() < 1e-3);
    }

    #[test]
    fn test_large_difference_is_significant() {
        let control = VariantStats::new("A", 1000, 100);
        let treatment = VariantStats::new("B", 1000, 150);
        let result = significance(&control, &treatment, &AnalyticsConfig::default());

        assert!(result.significant);
        assert!(result.confidence > 99.0);
        assert!((result.z_score - 3.38).abs() < 0.01);
        assert!((result.lift - 50.0).abs() < 1e-9);
        assert!(result.message.is_none());
    }

    #[test]
    fn test_small_samples_are_rejected() {
        let control = VariantStats::new("A", 10, 1);
        let treatment = VariantStats::new("B", 10, 5);
        let result = significance(&control, &treatment, &AnalyticsConfig::default());

        assert!(!result.significant);
        assert_eq!(result.message.as_deref(), Some(INSUFFICIENT_SAMPLE));
    }

    #[test]
    fn test_identical_variants_are_not_significant() {
        let a = VariantStats::new("A", 500, 50);
        let b = VariantStats::new("B", 500, 50);
        let result = significance(&a, &b, &AnalyticsConfig::default());
        assert!(result.confidence < 1e-6);
        assert!(!result.significant);

        let none = VariantStats::new("C", 500, 0);
        assert!(!significance(&none, &none, &AnalyticsConfig::default()).significant);
    }

    #[test]
    fn test_variant_stats_from_submissions() {
        let mut form = Form::with_id("f", "F");
        form.add_field(FieldDefinition::new("email", FieldType::Email, "Email")).unwrap();
        let full: Values = [("email".to_string(), json!("a@b.co"))].into_iter().collect();
        let subs = vec![
            Submission::for_form(&form, full.clone(), Utc::now()).with_variant("B"),
            Submission::for_form(&form, Values::new(), Utc::now()).with_variant("A"),
            Submission::for_form(&form, full, Utc::now()).with_variant("A"),
            Submission::for_form(&form, Values::new(), Utc::now()),
        ];
        let refs: Vec<_> = subs.iter().collect();

        let stats = variant_stats(&form, &refs);
        assert_eq!(stats, vec![VariantStats::new("A", 2, 1), VariantStats::new("B", 1, 1)]);
    }
}
