//! Submission value helpers
//!
//! Every crate asks the same questions about raw JSON answers: is it present,
//! what number or date does it hold, how long is it. The answers live here so
//! validation, cross-field checks and analytics cannot drift apart.

use crate::field::FieldType;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;

/// Values of a submission (or a submission in progress) keyed by field id
pub type Values = HashMap<String, Value>;

/// Presence check shared by all modules.
///
/// `null`, whitespace-only strings, empty arrays and empty objects are absent.
/// `0` and `false` are present.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Presence check for an answer to a field of the given type.
///
/// An unchecked single checkbox (`false`) is not an answer.
pub fn is_answered(field_type: FieldType, value: &Value) -> bool {
    if field_type == FieldType::Checkbox && value == &Value::Bool(false) {
        return false;
    }
    is_present(value)
}

/// Presence of a possibly missing value
pub fn is_present_opt(value: Option<&Value>) -> bool {
    value.map(is_present).unwrap_or(false)
}

/// Text rendering used for length checks, patterns and display
pub fn as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(as_text).collect::<Vec<_>>().join(", "),
        Value::Object(_) => value.to_string(),
    }
}

/// Numeric reading of a value; numeric strings are accepted
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Length in characters, or in items for lists
pub fn length(value: &Value) -> usize {
    match value {
        Value::Array(items) => items.len(),
        Value::String(s) => s.chars().count(),
        other => as_text(other).chars().count(),
    }
}

/// Parse a date or date-time.
///
/// Accepts RFC 3339, `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM[:SS]` and numeric
/// epoch milliseconds.
pub fn parse_date(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::String(s) => parse_date_str(s.trim()),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.naive_utc()),
        _ => None,
    }
}

/// Parse a date string, see [`parse_date`]
pub fn parse_date_str(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Equality that compares numbers numerically and scalars by their text form
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    if left == right {
        return true;
    }
    match (as_number(left), as_number(right)) {
        (Some(a), Some(b)) => a == b,
        _ => match (left, right) {
            (Value::Array(_), _) | (_, Value::Array(_)) => false,
            (Value::Object(_), _) | (_, Value::Object(_)) => false,
            _ => as_text(left) == as_text(right),
        },
    }
}

/// Whether `haystack` contains `needle` (substring for text, element for lists).
///
/// A `null` needle is never contained.
pub fn contains(haystack: &Value, needle: &Value) -> bool {
    if needle.is_null() {
        return false;
    }
    match haystack {
        Value::Array(items) => items.iter().any(|item| loose_eq(item, needle)),
        Value::Null => false,
        other => as_text(other).contains(&as_text(needle)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_presence() {
        assert!(!is_present(&Value::Null));
        assert!(!is_present(&json!("   ")));
        assert!(!is_present(&json!([])));
        assert!(!is_present(&json!({})));
        assert!(is_present(&json!(0)));
        assert!(is_present(&json!(false)));
        assert!(is_present(&json!("a")));
    }

    #[test]
    fn test_unchecked_checkbox_is_not_an_answer() {
        assert!(!is_answered(FieldType::Checkbox, &json!(false)));
        assert!(is_answered(FieldType::Checkbox, &json!(true)));
        assert!(is_answered(FieldType::Radio, &json!(false)));
        assert!(is_answered(FieldType::Number, &json!(0)));
    }

    #[test]
    fn test_dates() {
        let day = parse_date(&json!("2024-03-01")).unwrap();
        let time = parse_date(&json!("2024-03-01T10:30:00Z")).unwrap();
        assert!(day < time);
        assert!(parse_date(&json!("not a date")).is_none());
        assert!(parse_date(&json!("2024-02-30")).is_none());
    }

    #[test]
    fn test_loose_eq() {
        assert!(loose_eq(&json!("5"), &json!(5)));
        assert!(loose_eq(&json!(true), &json!("true")));
        assert!(!loose_eq(&json!("a"), &json!("b")));
        assert!(contains(&json!(["x", "y"]), &json!("y")));
        assert!(contains(&json!("hello world"), &json!("world")));
    }

    #[test]
    fn test_null_needle_is_never_contained() {
        assert!(!contains(&json!("hello world"), &Value::Null));
        assert!(!contains(&json!(["x", null]), &Value::Null));
        assert!(!contains(&json!(""), &Value::Null));
    }
}
