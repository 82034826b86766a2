//! Single field validation
//!
//! Order of evaluation:
//!
//! 1. required check; an absent required value yields one `required` error
//! 2. absent optional values are valid and skip everything else
//! 3. implicit type check for the declared field type
//! 4. declared rules, in list order

use crate::cache::ValidationCache;
use crate::message::MessageParams;
use crate::registry::{RuleRegistry, RULE_ERROR_MESSAGE};
use crate::result::{ValidationIssue, ValidationResult};
use crate::rules::{evaluate, RuleContext, RuleOutcome};
use crate::ValidationConfig;
use formkit_core::field::{FieldDefinition, FieldType, Rule};
use formkit_core::value::{as_number, as_text, is_answered, parse_date};
use formkit_core::{Clock, SystemClock, Values};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Per-call options
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldValidationOptions {
    /// Serve and store results in the TTL cache
    pub use_cache: bool,
}

impl FieldValidationOptions {
    /// Options with caching on
    pub fn cached() -> Self {
        Self { use_cache: true }
    }
}

/// Validator counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidatorStats {
    /// Values validated, cache hits included
    pub validations: u64,
    /// Results served from the cache
    pub cache_hits: u64,
    /// Rules skipped as unknown or broken
    pub skipped_rules: u64,
}

/// Validates one value against one field definition
pub struct FieldValidator {
    registry: Arc<RuleRegistry>,
    cache: ValidationCache,
    clock: Arc<dyn Clock>,
    config: ValidationConfig,
    validations: AtomicU64,
    cache_hits: AtomicU64,
    skipped_rules: AtomicU64,
}

impl FieldValidator {
    /// Validator on the system clock
    pub fn new(registry: Arc<RuleRegistry>, config: ValidationConfig) -> Self {
        Self::with_clock(registry, config, Arc::new(SystemClock))
    }

    /// Validator with an injected clock for date rules
    pub fn with_clock(registry: Arc<RuleRegistry>, config: ValidationConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: ValidationCache::from_config(&config),
            registry,
            clock,
            config,
            validations: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            skipped_rules: AtomicU64::new(0),
        }
    }

    /// Registry used for rules and messages
    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    /// Result cache
    pub fn cache(&self) -> &ValidationCache {
        &self.cache
    }

    /// Clock used for date rules
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Active configuration
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate `value` for `field`; `values` holds the rest of the submission
    pub fn validate_field(
        &self,
        value: &Value,
        field: &FieldDefinition,
        values: &Values,
        options: FieldValidationOptions,
    ) -> ValidationResult {
        self.validations.fetch_add(1, Ordering::Relaxed);

        let key = options.use_cache.then(|| {
            let context = json!({
                "field": serde_json::to_value(field).unwrap_or(Value::Null),
                "values": serde_json::to_value(values).unwrap_or(Value::Null),
            });
            ValidationCache::key("field", &field.id, value, &context)
        });

        if let Some(key) = &key {
            if let Some(hit) = self.cache.get_field(key) {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(field = %field.id, "field validation cache hit");
                return hit;
            }
        }

        let result = self.evaluate(value, field, values);

        if let Some(key) = key {
            self.cache.insert_field(key, result.clone());
        }
        result
    }

    fn evaluate(&self, value: &Value, field: &FieldDefinition, values: &Values) -> ValidationResult {
        let mut result = ValidationResult::valid();

        if !is_answered(field.field_type, value) {
            if field.required {
                let message = self.message(field, "required", value, MessageParams::new());
                result.push(ValidationIssue::error("required", message).for_field(&field.id));
            }
            return result;
        }

        if self.config.enforce_field_types {
            if let Some(rule) = self.type_violation(value, field) {
                let message = self.message(field, rule, value, MessageParams::new());
                result.push(ValidationIssue::error(rule, message).for_field(&field.id));
            }
        }

        let ctx = RuleContext {
            registry: &self.registry,
            values,
            now: self.clock.now().naive_utc(),
        };

        for rule in &field.validation_rules {
            match evaluate(rule, value, field, &ctx) {
                RuleOutcome::Pass | RuleOutcome::Deferred => {}
                RuleOutcome::Fail(params) => {
                    let message = self.message(field, rule.name(), value, params);
                    result.push(ValidationIssue::error(rule.name(), message).for_field(&field.id));
                }
                RuleOutcome::Error(reason) => {
                    tracing::warn!(field = %field.id, rule = %rule.name(), %reason, "validation rule failed to evaluate");
                    result.push(ValidationIssue::error(rule.name(), RULE_ERROR_MESSAGE).for_field(&field.id));
                }
                RuleOutcome::Skipped(reason) => {
                    self.skipped_rules.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(field = %field.id, rule = %rule.name(), %reason, "validation rule skipped");
                    result.push(ValidationIssue::warning(rule.name(), reason).for_field(&field.id));
                }
            }
        }

        result
    }

    /// Rule name of the implicit type check that fails, if any.
    ///
    /// A type check is dropped when the field declares the same rule itself.
    fn type_violation(&self, value: &Value, field: &FieldDefinition) -> Option<&'static str> {
        let declares = |wanted: &Rule| field.validation_rules.iter().any(|r| r == wanted);
        match field.field_type {
            FieldType::Email if !declares(&Rule::Email) => {
                let ok = self.registry.patterns().email.is_match(as_text(value).trim());
                (!ok).then_some("email")
            }
            FieldType::Number if !declares(&Rule::Numeric) => as_number(value).is_none().then_some("numeric"),
            FieldType::Date if !declares(&Rule::Date) => parse_date(value).is_none().then_some("date"),
            FieldType::Select | FieldType::Radio if !field.options.is_empty() => {
                (!field.allows_option(&as_text(value))).then_some("oneOf")
            }
            FieldType::Checkbox if !field.options.is_empty() => match value {
                Value::Array(items) => items
                    .iter()
                    .any(|item| !field.allows_option(&as_text(item)))
                    .then_some("oneOf"),
                _ => None,
            },
            _ => None,
        }
    }

    /// Render the message for `rule`; per-field overrides win over the registry
    pub(crate) fn message(&self, field: &FieldDefinition, rule: &str, value: &Value, params: MessageParams) -> String {
        let template = field
            .messages
            .get(rule)
            .cloned()
            .unwrap_or_else(|| self.registry.template(rule));
        let params = params.with("label", &field.label).with("value", as_text(value));
        self.registry.render(&template, &params)
    }

    /// Counter snapshot
    pub fn stats(&self) -> ValidatorStats {
        ValidatorStats {
            validations: self.validations.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            skipped_rules: self.skipped_rules.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use formkit_core::field::FieldOption;
    use formkit_core::ManualClock;
    use proptest::prelude::*;

    fn validator() -> FieldValidator {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap());
        FieldValidator::with_clock(Arc::new(RuleRegistry::new()), ValidationConfig::default(), Arc::new(clock))
    }

    fn check(v: &FieldValidator, field: &FieldDefinition, value: Value) -> ValidationResult {
        v.validate_field(&value, field, &Values::new(), FieldValidationOptions::default())
    }

    #[test]
    fn test_max_length() {
        let v = validator();
        let name = FieldDefinition::new("name", FieldType::Text, "Name")
            .required()
            .with_rule(Rule::MaxLength(5));

        assert!(check(&v, &name, json!("hello")).is_valid);

        let too_long = check(&v, &name, json!("hello!"));
        assert_eq!(too_long.error_rules(), vec!["maxLength"]);
        assert_eq!(too_long.errors[0].message, "Name must be no more than 5 characters");
        assert_eq!(too_long.errors[0].field_id.as_deref(), Some("name"));

        let empty = check(&v, &name, json!(""));
        assert_eq!(empty.error_rules(), vec!["required"]);
    }

    #[test]
    fn test_optional_absent_is_valid() {
        let v = validator();
        let nick = FieldDefinition::new("nick", FieldType::Text, "Nickname").with_rule(Rule::MinLength(3));
        assert!(check(&v, &nick, Value::Null).is_valid);
        assert!(check(&v, &nick, json!("  ")).is_valid);
    }

    #[test]
    fn test_zero_satisfies_required_number() {
        let v = validator();
        let qty = FieldDefinition::new("qty", FieldType::Number, "Quantity").required();
        assert!(check(&v, &qty, json!(0)).is_valid);
    }

    #[test]
    fn test_unchecked_checkbox_is_not_an_answer() {
        let v = validator();
        let terms = FieldDefinition::new("terms", FieldType::Checkbox, "Terms").required();
        assert_eq!(check(&v, &terms, json!(false)).error_rules(), vec!["required"]);
        assert!(check(&v, &terms, json!(true)).is_valid);
    }

    #[test]
    fn test_implicit_type_checks() {
        let v = validator();
        let email = FieldDefinition::new("email", FieldType::Email, "Email");
        assert_eq!(check(&v, &email, json!("nope")).error_rules(), vec!["email"]);

        let age = FieldDefinition::new("age", FieldType::Number, "Age");
        assert_eq!(check(&v, &age, json!("abc")).error_rules(), vec!["numeric"]);

        let plan = FieldDefinition::new("plan", FieldType::Select, "Plan")
            .with_options(vec![FieldOption::new("Free", "free"), FieldOption::new("Pro", "pro")]);
        assert!(check(&v, &plan, json!("pro")).is_valid);
        assert_eq!(check(&v, &plan, json!("gold")).error_rules(), vec!["oneOf"]);
    }

    #[test]
    fn test_declared_rule_replaces_type_check() {
        let v = validator();
        let email = FieldDefinition::new("email", FieldType::Email, "Email").with_rule(Rule::Email);
        assert_eq!(check(&v, &email, json!("nope")).error_rules(), vec!["email"]);
    }

    #[test]
    fn test_field_message_override() {
        let v = validator();
        let name = FieldDefinition::new("name", FieldType::Text, "Name")
            .required()
            .with_message("required", "Tell us your {label}");
        assert_eq!(check(&v, &name, Value::Null).errors[0].message, "Tell us your Name");
    }

    #[test]
    fn test_broken_and_unknown_rules() {
        let registry = Arc::new(RuleRegistry::new());
        registry.register("broken", |_, _, _| Err("service down".into()), "{label} bad");
        let v = FieldValidator::new(registry, ValidationConfig::default());
        let field = FieldDefinition::new("code", FieldType::Text, "Code")
            .with_rule(Rule::Custom { name: "broken".into(), options: Value::Null })
            .with_rule(Rule::Custom { name: "ghost".into(), options: Value::Null })
            .with_rule(Rule::MaxLength(2));

        let result = check(&v, &field, json!("abc"));
        assert_eq!(result.error_rules(), vec!["broken", "maxLength"]);
        assert_eq!(result.errors[0].message, RULE_ERROR_MESSAGE);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].rule, "ghost");
        assert_eq!(v.stats().skipped_rules, 1);
    }

    #[test]
    fn test_cache_hits_are_counted() {
        let v = validator();
        let name = FieldDefinition::new("name", FieldType::Text, "Name").with_rule(Rule::MaxLength(5));
        let values = Values::new();

        let first = v.validate_field(&json!("hello!"), &name, &values, FieldValidationOptions::cached());
        let second = v.validate_field(&json!("hello!"), &name, &values, FieldValidationOptions::cached());
        assert_eq!(first, second);
        assert_eq!(v.stats().validations, 2);
        assert_eq!(v.stats().cache_hits, 1);

        let edited = name.clone().with_rule(Rule::MinLength(10));
        v.validate_field(&json!("hello!"), &edited, &values, FieldValidationOptions::cached());
        assert_eq!(v.stats().cache_hits, 1);
    }

    proptest! {
        #[test]
        fn prop_validation_is_idempotent(text in ".{0,12}", required in any::<bool>()) {
            let v = validator();
            let mut field = FieldDefinition::new("f", FieldType::Text, "Field")
                .with_rule(Rule::MaxLength(5))
                .with_rule(Rule::Pattern("^[a-z]*$".into()));
            field.required = required;
            let value = json!(text);
            let a = check(&v, &field, value.clone());
            let b = check(&v, &field, value);
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_required_absent_yields_single_error(blank in "[ \t]{0,4}") {
            let v = validator();
            let field = FieldDefinition::new("f", FieldType::Text, "Field")
                .required()
                .with_rule(Rule::MinLength(3))
                .with_rule(Rule::Email);
            let result = check(&v, &field, json!(blank));
            prop_assert_eq!(result.error_rules(), vec!["required"]);
        }
    }
}
