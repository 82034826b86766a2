//! Whole-submission validation

use crate::cache::ValidationCache;
use crate::cross_field::CrossFieldResolver;
use crate::field::{FieldValidationOptions, FieldValidator};
use crate::result::{FormValidationResult, ValidationIssue, ValidationResult, ValidationSummary};
use formkit_core::{Form, Values};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Options for one form validation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormValidationOptions {
    /// Run the cross-field resolver after all fields
    pub enable_cross_field_validation: bool,
    /// Stop at the first field with errors; results so far are returned
    pub stop_on_first_error: bool,
    /// Serve and store results in the TTL cache
    pub use_cache: bool,
    /// Ignore fields whose visibility conditions do not hold
    pub skip_hidden_fields: bool,
}

/// Validates every field of a form against one submission
pub struct FormValidator {
    fields: Arc<FieldValidator>,
    resolver: CrossFieldResolver,
}

impl FormValidator {
    /// Form validator built on a field validator
    pub fn new(fields: Arc<FieldValidator>) -> Self {
        Self {
            resolver: CrossFieldResolver::new(fields.registry().clone()),
            fields,
        }
    }

    /// Underlying field validator
    pub fn field_validator(&self) -> &Arc<FieldValidator> {
        &self.fields
    }

    /// Validate `values` against `form`.
    ///
    /// Never panics: an internal failure yields [`FormValidationResult::failed`].
    pub fn validate_form(&self, form: &Form, values: &Values, options: FormValidationOptions) -> FormValidationResult {
        match catch_unwind(AssertUnwindSafe(|| self.validate_cached(form, values, options))) {
            Ok(result) => result,
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(form = %form.id, %reason, "form validation failed");
                FormValidationResult::failed()
            }
        }
    }

    fn validate_cached(&self, form: &Form, values: &Values, options: FormValidationOptions) -> FormValidationResult {
        let cache = self.fields.cache();
        let key = options.use_cache.then(|| {
            let submitted = serde_json::to_value(values).unwrap_or(Value::Null);
            let context = json!({
                "fields": serde_json::to_value(&form.fields).unwrap_or(Value::Null),
                "options": serde_json::to_value(options).unwrap_or(Value::Null),
            });
            ValidationCache::key("form", &form.id, &submitted, &context)
        });

        if let Some(key) = &key {
            if let Some(hit) = cache.get_form(key) {
                tracing::debug!(form = %form.id, "form validation cache hit");
                return hit;
            }
        }

        let result = self.run(form, values, options);

        if let Some(key) = key {
            cache.insert_form(key, result.clone());
        }
        result
    }

    fn run(&self, form: &Form, values: &Values, options: FormValidationOptions) -> FormValidationResult {
        let candidates = if options.skip_hidden_fields {
            CrossFieldResolver::visible_fields(form, values)
        } else {
            form.ordered_fields()
        };
        let field_options = FieldValidationOptions {
            use_cache: options.use_cache,
        };

        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut field_results: BTreeMap<String, ValidationResult> = BTreeMap::new();
        let mut stopped = false;

        for field in candidates {
            let value = values.get(&field.id).unwrap_or(&Value::Null);
            let result = self.fields.validate_field(value, field, values, field_options);
            errors.extend(result.errors.iter().cloned());
            warnings.extend(result.warnings.iter().cloned());
            let failed = !result.is_valid;
            field_results.insert(field.id.clone(), result);

            if failed && options.stop_on_first_error {
                stopped = true;
                break;
            }
        }

        if options.enable_cross_field_validation && !stopped {
            for issue in self.resolver.resolve(form, values) {
                // Issues for skipped (hidden) fields are dropped with them
                let Some(entry) = issue.field_id.as_ref().and_then(|id| field_results.get_mut(id)) else {
                    continue;
                };
                entry.push(issue.clone());
                errors.push(issue);
            }
        }

        let mut unknown: Vec<&String> = values.keys().filter(|k| !form.has_field(k)).collect();
        unknown.sort();
        for key in unknown {
            warnings.push(ValidationIssue::warning("unknownField", format!("Unknown field '{}'", key)).for_field(key));
        }

        let invalid_fields = field_results.values().filter(|r| !r.is_valid).count();
        let summary = ValidationSummary {
            total_fields: field_results.len(),
            valid_fields: field_results.len() - invalid_fields,
            invalid_fields,
            total_errors: errors.len(),
            total_warnings: warnings.len(),
        };

        FormValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            field_results,
            summary: Some(summary),
        }
    }
}
