//! Cell rendering shared by the tabular exports

use formkit_core::field::FieldDefinition;
use formkit_core::value::{as_number, as_text};
use formkit_core::{FieldType, Form, Submission};
use serde_json::Value;

/// Columns in export order: the form's fields sorted by `order`
pub fn columns(form: &Form) -> Vec<&FieldDefinition> {
    form.ordered_fields()
}

/// Text shown for one answer
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::Array(items)) => items.iter().map(item_text).collect::<Vec<_>>().join("; "),
        Some(other) => item_text(other),
    }
}

/// File objects show their name, everything else its text form
fn item_text(value: &Value) -> String {
    match value.get("name").and_then(Value::as_str) {
        Some(name) if value.is_object() => name.to_string(),
        _ => as_text(value),
    }
}

/// Numeric reading of an answer to a number field
pub fn numeric_cell(field: &FieldDefinition, value: Option<&Value>) -> Option<f64> {
    if field.field_type != FieldType::Number {
        return None;
    }
    value.and_then(as_number)
}

pub fn submitted_at_text(submission: &Submission, format: &str) -> String {
    submission.submitted_at().format(format).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(None), "");
        assert_eq!(cell_text(Some(&json!(["red", "blue"]))), "red; blue");
        assert_eq!(cell_text(Some(&json!({"name": "cv.pdf", "size": 10}))), "cv.pdf");
        assert_eq!(cell_text(Some(&json!(3.5))), "3.5");
    }
}
