//! Conversion funnel over the form's field order

use crate::overview::percent;
use formkit_core::value::is_answered;
use formkit_core::{Form, Submission};
use serde::{Deserialize, Serialize};

/// One field of the completion funnel
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStep {
    /// Field of this step
    pub field_id: String,
    /// Field label
    pub label: String,
    /// Submissions that answered this field
    pub completed: u64,
    /// Share of all submissions reaching this step, percent
    pub completion_rate: f64,
    /// Relative loss against the previous step, percent
    pub drop_off_rate: f64,
}

/// Treat the fields, in order, as a linear funnel
pub fn funnel(form: &Form, submissions: &[&Submission]) -> Vec<FunnelStep> {
    let total = submissions.len() as f64;
    let mut previous: Option<u64> = None;

    form.ordered_fields()
        .into_iter()
        .map(|field| {
            let completed = submissions
                .iter()
                .filter(|s| s.data.get(&field.id).is_some_and(|v| is_answered(field.field_type, v)))
                .count() as u64;
            let drop_off_rate = match previous {
                Some(prev) if prev > 0 => percent(prev as f64 - completed as f64, prev as f64),
                _ => 0.0,
            };
            previous = Some(completed);
            FunnelStep {
                field_id: field.id.clone(),
                label: field.label.clone(),
                completed,
                completion_rate: percent(completed as f64, total),
                drop_off_rate,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use formkit_core::{FieldDefinition, FieldType, Values};
    use proptest::prelude::*;
    use serde_json::json;

    fn three_step_form() -> Form {
        let mut form = Form::with_id("checkout", "Checkout");
        for id in ["email", "address", "payment"] {
            form.add_field(FieldDefinition::new(id, FieldType::Text, id)).unwrap();
        }
        form
    }

    /// A submission that answered the first `depth` fields
    fn reached(form: &Form, depth: usize) -> Submission {
        let data: Values = form
            .ordered_fields()
            .iter()
            .take(depth)
            .map(|f| (f.id.clone(), json!("x")))
            .collect();
        Submission::for_form(form, data, Utc::now())
    }

    #[test]
    fn test_drop_off() {
        let form = three_step_form();
        let mut subs = Vec::new();
        subs.extend((0..10).map(|_| reached(&form, 3)));
        subs.extend((0..10).map(|_| reached(&form, 2)));
        subs.extend((0..20).map(|_| reached(&form, 1)));
        let refs: Vec<_> = subs.iter().collect();

        let steps = funnel(&form, &refs);
        let completed: Vec<_> = steps.iter().map(|s| s.completed).collect();
        assert_eq!(completed, vec![40, 20, 10]);
        assert_eq!(steps[0].drop_off_rate, 0.0);
        assert!((steps[1].drop_off_rate - 50.0).abs() < 1e-9);
        assert!((steps[2].drop_off_rate - 50.0).abs() < 1e-9);
        assert!((steps[2].completion_rate - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_previous_count() {
        let form = three_step_form();
        let subs = vec![reached(&form, 0)];
        let refs: Vec<_> = subs.iter().collect();
        assert!(funnel(&form, &refs).iter().all(|s| s.drop_off_rate == 0.0));
    }

    proptest! {
        #[test]
        fn prop_prefix_funnel_is_monotone(depths in proptest::collection::vec(0usize..=3, 0..60)) {
            let form = three_step_form();
            let subs: Vec<_> = depths.iter().map(|d| reached(&form, *d)).collect();
            let refs: Vec<_> = subs.iter().collect();
            let steps = funnel(&form, &refs);

            prop_assert_eq!(steps[0].drop_off_rate, 0.0);
            for pair in steps.windows(2) {
                prop_assert!(pair[1].completed <= pair[0].completed);
                prop_assert!((0.0..=100.0).contains(&pair[1].drop_off_rate));
            }
        }
    }
}
