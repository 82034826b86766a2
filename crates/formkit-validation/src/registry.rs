//! Rule registry
//!
//! Holds message templates for the built-in rules, custom rules registered by
//! name, and compiled regular expressions.

use crate::message::{render, MessageParams};
use dashmap::DashMap;
use formkit_core::Values;
use parking_lot::RwLock;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Predicate of a custom rule: `(value, options, all values) -> passed`.
///
/// Returning `Err` reports a broken rule, not a failed value.
pub type RulePredicate = Arc<dyn Fn(&Value, &Value, &Values) -> Result<bool, String> + Send + Sync>;

/// A rule registered by name
#[derive(Clone)]
pub struct CustomRule {
    /// Name referenced by `Rule::Custom`
    pub name: String,
    /// Check run for each value
    pub predicate: RulePredicate,
    /// Message template used on failure
    pub template: String,
}

impl fmt::Debug for CustomRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomRule")
            .field("name", &self.name)
            .field("template", &self.template)
            .finish()
    }
}

/// Pre-compiled patterns for the built-in format rules
pub struct BuiltinPatterns {
    /// Email address format
    pub email: Regex,
    /// http(s) URL format
    pub url: Regex,
    /// Phone number format
    pub phone: Regex,
    /// `{name}` placeholders in message templates
    pub placeholder: Regex,
}

impl BuiltinPatterns {
    fn compile() -> Self {
        Self {
            email: Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("built-in email pattern"),
            url: Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("built-in url pattern"),
            phone: Regex::new(r"^\+?[0-9\s\-().]{7,20}$").expect("built-in phone pattern"),
            placeholder: Regex::new(r"\{(\w+)\}").expect("built-in placeholder pattern"),
        }
    }
}

const DEFAULT_TEMPLATE: &str = "{label} is invalid";

/// Generic message for a rule that failed to evaluate
pub const RULE_ERROR_MESSAGE: &str = "Validation error occurred";

fn default_templates() -> HashMap<String, String> {
    [
        ("required", "{label} is required"),
        ("minLength", "{label} must be at least {min} characters"),
        ("maxLength", "{label} must be no more than {max} characters"),
        ("min", "{label} must be at least {min}"),
        ("max", "{label} must be no more than {max}"),
        ("pattern", "{label} format is invalid"),
        ("email", "Please enter a valid email address"),
        ("url", "Please enter a valid URL"),
        ("phone", "Please enter a valid phone number"),
        ("numeric", "{label} must be a number"),
        ("integer", "{label} must be a whole number"),
        ("date", "Please enter a valid date"),
        ("futureDate", "{label} must be a future date"),
        ("pastDate", "{label} must be a past date"),
        ("minDate", "{label} must be on or after {min}"),
        ("maxDate", "{label} must be on or before {max}"),
        ("minItems", "Select at least {min} options for {label}"),
        ("maxItems", "Select no more than {max} options for {label}"),
        ("fileSize", "File size must be less than {max}"),
        ("fileType", "File type must be one of: {types}"),
        ("oneOf", "{label} must be one of the available options"),
        ("beforeField", "{label} must be before {other}"),
        ("afterField", "{label} must be after {other}"),
        ("confirmPassword", "Passwords do not match"),
        ("conditionalRequired", "{label} is required"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Registry of rule templates and custom rules
pub struct RuleRegistry {
    custom: RwLock<HashMap<String, CustomRule>>,
    templates: RwLock<HashMap<String, String>>,
    patterns: BuiltinPatterns,
    compiled: DashMap<String, Result<Regex, String>>,
}

impl RuleRegistry {
    /// Registry with the built-in templates and no custom rules
    pub fn new() -> Self {
        Self {
            custom: RwLock::new(HashMap::new()),
            templates: RwLock::new(default_templates()),
            patterns: BuiltinPatterns::compile(),
            compiled: DashMap::new(),
        }
    }

    /// Register (or replace) a custom rule
    pub fn register<F>(&self, name: impl Into<String>, predicate: F, template: impl Into<String>)
    where
        F: Fn(&Value, &Value, &Values) -> Result<bool, String> + Send + Sync + 'static,
    {
        let name = name.into();
        let rule = CustomRule {
            name: name.clone(),
            predicate: Arc::new(predicate),
            template: template.into(),
        };
        tracing::debug!(rule = %name, "registered custom validation rule");
        self.custom.write().insert(name, rule);
    }

    /// Look up a custom rule
    pub fn get(&self, name: &str) -> Option<CustomRule> {
        self.custom.read().get(name).cloned()
    }

    /// Remove a custom rule, returning it
    pub fn unregister(&self, name: &str) -> Option<CustomRule> {
        self.custom.write().remove(name)
    }

    /// Override the template of a built-in rule
    pub fn set_template(&self, rule: impl Into<String>, template: impl Into<String>) {
        self.templates.write().insert(rule.into(), template.into());
    }

    /// Template for a rule name: built-in, then custom, then a generic fallback
    pub fn template(&self, rule: &str) -> String {
        if let Some(template) = self.templates.read().get(rule) {
            return template.clone();
        }
        self.custom
            .read()
            .get(rule)
            .map(|c| c.template.clone())
            .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string())
    }

    /// Render a template with the registry's placeholder syntax
    pub fn render(&self, template: &str, params: &MessageParams) -> String {
        render(&self.patterns.placeholder, template, params)
    }

    /// Compiled built-in patterns
    pub fn patterns(&self) -> &BuiltinPatterns {
        &self.patterns
    }

    /// Compile a user pattern once; failures are remembered too
    pub fn compile(&self, pattern: &str) -> Result<Regex, String> {
        if let Some(cached) = self.compiled.get(pattern) {
            return cached.value().clone();
        }
        let compiled = Regex::new(pattern).map_err(|e| e.to_string());
        self.compiled.insert(pattern.to_string(), compiled.clone());
        compiled
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_and_get() {
        let registry = RuleRegistry::new();
        registry.register(
            "zip",
            |value, _options, _values| Ok(value.as_str().is_some_and(|s| s.len() == 5)),
            "{label} must be a 5 digit ZIP code",
        );

        let rule = registry.get("zip").unwrap();
        assert!((rule.predicate)(&json!("12345"), &Value::Null, &Values::new()).unwrap());
        assert_eq!(registry.template("zip"), "{label} must be a 5 digit ZIP code");
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_template_fallbacks() {
        let registry = RuleRegistry::new();
        assert_eq!(registry.template("required"), "{label} is required");
        assert_eq!(registry.template("unheard"), DEFAULT_TEMPLATE);

        registry.set_template("required", "Please fill in {label}");
        let params = MessageParams::new().with("label", "Name");
        assert_eq!(registry.render(&registry.template("required"), &params), "Please fill in Name");
    }

    #[test]
    fn test_compile_caches_failures() {
        let registry = RuleRegistry::new();
        assert!(registry.compile("^[a-z]+$").unwrap().is_match("abc"));
        assert!(registry.compile("(").is_err());
        assert!(registry.compile("(").is_err());
    }
}
