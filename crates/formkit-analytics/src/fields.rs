//! Per-field response analysis

use crate::overview::percent;
use formkit_core::value::{as_text, is_answered};
use formkit_core::{FieldType, Form, Submission};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Response statistics for one field
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldAnalysis {
    /// Field analysed
    pub field_id: String,
    /// Field label
    pub label: String,
    /// Field input type
    pub field_type: FieldType,
    /// Submissions that answered the field
    pub response_count: u64,
    /// Share of submissions that answered, percent
    pub completion_rate: f64,
    /// Number of different answers
    pub distinct_values: u64,
    /// Most frequent answer; the first one seen wins a tie
    pub most_common_value: Option<String>,
    /// How often the most common answer appears
    pub most_common_count: u64,
    /// Mean answer length in characters
    pub average_length: f64,
}

/// Analyse every field of `form`, in field order
pub fn field_analysis(form: &Form, submissions: &[&Submission]) -> Vec<FieldAnalysis> {
    let total = submissions.len() as f64;
    form.ordered_fields()
        .into_iter()
        .map(|field| {
            let answers: Vec<String> = submissions
                .iter()
                .filter_map(|s| s.data.get(&field.id))
                .filter(|v| is_answered(field.field_type, v))
                .map(as_text)
                .collect();

            // value -> (count, first seen)
            let mut tally: HashMap<&str, (u64, usize)> = HashMap::new();
            for (seen, answer) in answers.iter().enumerate() {
                tally.entry(answer.as_str()).or_insert((0, seen)).0 += 1;
            }
            let most_common = tally
                .iter()
                .max_by(|(_, (ca, sa)), (_, (cb, sb))| ca.cmp(cb).then(sb.cmp(sa)))
                .map(|(value, (count, _))| (value.to_string(), *count));

            let total_length: usize = answers.iter().map(|a| a.chars().count()).sum();
            let responses = answers.len() as f64;

            FieldAnalysis {
                field_id: field.id.clone(),
                label: field.label.clone(),
                field_type: field.field_type,
                response_count: answers.len() as u64,
                completion_rate: percent(responses, total),
                distinct_values: tally.len() as u64,
                most_common_count: most_common.as_ref().map_or(0, |(_, c)| *c),
                most_common_value: most_common.map(|(v, _)| v),
                average_length: if answers.is_empty() {
                    0.0
                } else {
                    total_length as f64 / responses
                },
            }
        })
        .collect()
}
