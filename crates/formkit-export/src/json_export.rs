//! JSON export
//!
//! Answers are coerced to their field's declared type: number fields become
//! JSON numbers and single checkboxes become booleans. Keys the form does
//! not declare are kept unchanged.

use crate::error::ExportResult;
use chrono::{DateTime, Utc};
use formkit_core::field::FieldDefinition;
use formkit_core::value::as_number;
use formkit_core::{FieldType, Form, Submission};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// One exported submission
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedSubmission {
    pub id: String,
    pub form_id: String,
    pub submitted_at: DateTime<Utc>,
    pub data: Map<String, Value>,
}

pub fn export_records(form: &Form, submissions: &[Submission]) -> Vec<ExportedSubmission> {
    submissions
        .iter()
        .map(|submission| {
            let mut keys: Vec<&String> = submission.data.keys().collect();
            keys.sort();
            let data = keys
                .into_iter()
                .map(|key| {
                    let value = &submission.data[key];
                    let coerced = match form.field(key) {
                        Some(field) => coerce(field, value),
                        None => value.clone(),
                    };
                    (key.clone(), coerced)
                })
                .collect();
            ExportedSubmission {
                id: submission.id.clone(),
                form_id: submission.form_id.clone(),
                submitted_at: submission.submitted_at(),
                data,
            }
        })
        .collect()
}

pub fn to_json(form: &Form, submissions: &[Submission]) -> ExportResult<String> {
    Ok(serde_json::to_string_pretty(&export_records(form, submissions))?)
}

/// Parse a JSON export back into records
pub fn from_json(input: &str) -> ExportResult<Vec<ExportedSubmission>> {
    Ok(serde_json::from_str(input)?)
}

/// Convert an answer to the JSON type its field declares
pub fn coerce(field: &FieldDefinition, value: &Value) -> Value {
    match (field.field_type, value) {
        (FieldType::Number, Value::String(_)) => match as_number(value) {
            Some(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => Value::Number(Number::from(n as i64)),
            Some(n) => Number::from_f64(n).map(Value::Number).unwrap_or_else(|| value.clone()),
            None => value.clone(),
        },
        (FieldType::Checkbox, Value::String(s)) if field.options.is_empty() => {
            match s.trim().to_ascii_lowercase().as_str() {
                "true" | "on" | "yes" | "1" => Value::Bool(true),
                "false" | "off" | "no" | "0" | "" => Value::Bool(false),
                _ => value.clone(),
            }
        }
        _ => value.clone(),
    }
}
