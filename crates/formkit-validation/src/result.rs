//! Validation result types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How bad an issue is
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Makes the value invalid
    Error,
    /// Reported but does not block
    Warning,
    /// Informational notice
    Info,
}

/// One failed rule or notice
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    /// Rule name that produced the issue
    pub rule: String,
    /// Human readable message
    pub message: String,
    /// Field the issue belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,
    /// Error, warning or info
    pub severity: Severity,
}

impl ValidationIssue {
    /// Issue with error severity
    pub fn error(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            message: message.into(),
            field_id: None,
            severity: Severity::Error,
        }
    }

    /// Issue with warning severity
    pub fn warning(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(rule, message)
        }
    }

    /// Tag the issue with a field id
    pub fn for_field(mut self, field_id: impl Into<String>) -> Self {
        self.field_id = Some(field_id.into());
        self
    }
}

/// Outcome of validating one value
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// No errors
    pub is_valid: bool,
    /// Blocking issues
    pub errors: Vec<ValidationIssue>,
    /// Non-blocking issues
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Result with no issues
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Result holding a single error
    pub fn invalid(issue: ValidationIssue) -> Self {
        let mut result = Self::valid();
        result.push(issue);
        result
    }

    /// Add an issue to the list matching its severity
    pub fn push(&mut self, issue: ValidationIssue) {
        match issue.severity {
            Severity::Error => {
                self.errors.push(issue);
                self.is_valid = false;
            }
            Severity::Warning | Severity::Info => self.warnings.push(issue),
        }
    }

    /// Rule names of all errors, in order
    pub fn error_rules(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.rule.as_str()).collect()
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::valid()
    }
}

/// Counts over a form validation run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    /// Fields evaluated
    pub total_fields: usize,
    /// Evaluated fields without errors
    pub valid_fields: usize,
    /// Evaluated fields with errors
    pub invalid_fields: usize,
    /// Errors across the form
    pub total_errors: usize,
    /// Warnings across the form
    pub total_warnings: usize,
}

/// Outcome of validating a whole submission
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormValidationResult {
    /// No errors anywhere in the form
    pub is_valid: bool,
    /// Field and cross-field errors in evaluation order
    pub errors: Vec<ValidationIssue>,
    /// Warnings, unknown fields included
    pub warnings: Vec<ValidationIssue>,
    /// Per-field results for the fields that were evaluated
    pub field_results: BTreeMap<String, ValidationResult>,
    /// `None` when validation itself failed
    pub summary: Option<ValidationSummary>,
}

impl FormValidationResult {
    /// Fail-safe result returned when validation could not run
    pub fn failed() -> Self {
        Self {
            is_valid: false,
            errors: Vec::new(),
            warnings: Vec::new(),
            field_results: BTreeMap::new(),
            summary: None,
        }
    }

    /// Errors attached to one field
    pub fn errors_for<'a>(&'a self, field_id: &'a str) -> impl Iterator<Item = &'a ValidationIssue> + 'a {
        self.errors
            .iter()
            .filter(move |e| e.field_id.as_deref() == Some(field_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_routes_by_severity() {
        let mut result = ValidationResult::valid();
        result.push(ValidationIssue::warning("unknownRule", "skipped"));
        assert!(result.is_valid);

        result.push(ValidationIssue::error("required", "Name is required").for_field("name"));
        assert!(!result.is_valid);
        assert_eq!(result.error_rules(), vec!["required"]);
        assert_eq!(result.warnings.len(), 1);
    }
}
