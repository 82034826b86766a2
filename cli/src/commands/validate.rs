//! Validate and lint commands

use crate::config::Config;
use crate::input::read_document;
use crate::output::{self, KeyValue, OutputFormat};
use anyhow::{bail, Result};
use formkit_core::{Form, Values};
use formkit_validation::{
    FormValidationOptions, FormValidationResult, RuleRegistry, Severity, ValidationIssue, ValidationService,
};
use std::path::Path;
use std::sync::Arc;
use tabled::Tabled;

#[derive(Tabled)]
pub struct IssueRow {
    #[tabled(rename = "Field")]
    pub field: String,
    #[tabled(rename = "Severity")]
    pub severity: String,
    #[tabled(rename = "Rule")]
    pub rule: String,
    #[tabled(rename = "Message")]
    pub message: String,
}

impl From<&ValidationIssue> for IssueRow {
    fn from(issue: &ValidationIssue) -> Self {
        let severity = match issue.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        Self {
            field: issue.field_id.clone().unwrap_or_default(),
            severity: severity.to_string(),
            rule: issue.rule.clone(),
            message: issue.message.clone(),
        }
    }
}

pub fn run(form: &Form, values: &Values, options: FormValidationOptions, config: &Config) -> FormValidationResult {
    let service = ValidationService::new(Arc::new(RuleRegistry::new()), config.validation.clone());
    service.forms.validate_form(form, values, options)
}

pub fn handle(
    form_path: &Path,
    values_path: &Path,
    options: FormValidationOptions,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let form: Form = read_document(form_path)?;
    let values: Values = read_document(values_path)?;

    if format.is_table() {
        for warning in form.lint() {
            output::warning(&format!("{}: {}", warning.field_id, warning.message));
        }
    }

    let result = run(&form, &values, options, config);
    format.emit(&result, || {
        result.errors.iter().chain(&result.warnings).map(IssueRow::from).collect()
    })?;

    if format.is_table() {
        if let Some(summary) = &result.summary {
            println!(
                "{}",
                output::table(vec![
                    KeyValue::new("Fields", summary.total_fields),
                    KeyValue::new("Valid", summary.valid_fields),
                    KeyValue::new("Invalid", summary.invalid_fields),
                    KeyValue::new("Errors", summary.total_errors),
                    KeyValue::new("Warnings", summary.total_warnings),
                ])
            );
        }
    }

    match (&result.summary, result.is_valid) {
        (_, true) => {
            if format.is_table() {
                output::success("Submission is valid");
            }
            Ok(())
        }
        (None, false) => bail!("validation could not run"),
        (Some(summary), false) => bail!("submission has {} error(s)", summary.total_errors),
    }
}

pub fn lint(form_path: &Path, format: OutputFormat) -> Result<()> {
    let form: Form = read_document(form_path)?;
    let warnings = form.lint();
    format.emit(&warnings, || {
        warnings
            .iter()
            .map(|w| KeyValue::new(w.field_id.clone(), &w.message))
            .collect()
    })?;
    if warnings.is_empty() && format.is_table() {
        output::success("No configuration problems found");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use formkit_core::{FieldDefinition, FieldType, Rule};
    use serde_json::json;

    #[test]
    fn test_run_uses_configured_validation() {
        let mut form = Form::with_id("signup", "Sign up");
        form.add_field(FieldDefinition::new("email", FieldType::Email, "Email").required()).unwrap();
        form.add_field(
            FieldDefinition::new("password", FieldType::Text, "Password").with_rule(Rule::MinLength(8)),
        )
        .unwrap();
        let values: Values = [("password".to_string(), json!("short"))].into_iter().collect();

        let result = run(&form, &values, FormValidationOptions::default(), &Config::default());
        assert!(!result.is_valid);
        assert_eq!(result.summary.as_ref().unwrap().invalid_fields, 2);

        let rows: Vec<IssueRow> = result.errors.iter().map(IssueRow::from).collect();
        assert!(rows.iter().any(|r| r.field == "email" && r.rule == "required"));
        assert!(rows.iter().any(|r| r.field == "password" && r.rule == "minLength"));
    }
}
