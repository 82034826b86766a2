//! Built-in rule evaluation

use crate::message::{format_bytes, MessageParams};
use crate::registry::RuleRegistry;
use chrono::NaiveDateTime;
use formkit_core::field::{FieldDefinition, Rule};
use formkit_core::value::{as_number, as_text, length, parse_date, parse_date_str};
use formkit_core::Values;
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Result of evaluating one rule against one value
#[derive(Debug)]
pub(crate) enum RuleOutcome {
    Pass,
    /// Value failed; params fill the message template
    Fail(MessageParams),
    /// Rule blew up while evaluating
    Error(String),
    /// Rule could not be applied (configuration problem)
    Skipped(String),
    /// Evaluated later by the cross-field resolver
    Deferred,
}

impl RuleOutcome {
    fn check(passed: bool, params: MessageParams) -> Self {
        if passed {
            Self::Pass
        } else {
            Self::Fail(params)
        }
    }
}

/// Evaluation context shared by all rules of one field
pub(crate) struct RuleContext<'a> {
    pub registry: &'a RuleRegistry,
    pub values: &'a Values,
    pub now: NaiveDateTime,
}

pub(crate) fn evaluate(rule: &Rule, value: &Value, field: &FieldDefinition, ctx: &RuleContext<'_>) -> RuleOutcome {
    let params = MessageParams::new();
    match rule {
        Rule::MinLength(min) => RuleOutcome::check(length(value) >= *min, params.with("min", min)),
        Rule::MaxLength(max) => RuleOutcome::check(length(value) <= *max, params.with("max", max)),
        Rule::Min(min) => {
            let passed = as_number(value).is_some_and(|n| n >= *min);
            RuleOutcome::check(passed, params.with("min", min))
        }
        Rule::Max(max) => {
            let passed = as_number(value).is_some_and(|n| n <= *max);
            RuleOutcome::check(passed, params.with("max", max))
        }
        Rule::Pattern(pattern) => match ctx.registry.compile(pattern) {
            Ok(re) => RuleOutcome::check(re.is_match(&as_text(value)), params.with("pattern", pattern)),
            Err(e) => RuleOutcome::Skipped(format!("invalid pattern '{}': {}", pattern, e)),
        },
        Rule::Email => {
            let passed = ctx.registry.patterns().email.is_match(as_text(value).trim());
            RuleOutcome::check(passed, params)
        }
        Rule::Url => {
            let passed = ctx.registry.patterns().url.is_match(as_text(value).trim());
            RuleOutcome::check(passed, params)
        }
        Rule::Phone => {
            let passed = ctx.registry.patterns().phone.is_match(as_text(value).trim());
            RuleOutcome::check(passed, params)
        }
        Rule::Numeric => RuleOutcome::check(as_number(value).is_some(), params),
        Rule::Integer => {
            let passed = as_number(value).is_some_and(|n| n.fract() == 0.0);
            RuleOutcome::check(passed, params)
        }
        Rule::Date => RuleOutcome::check(parse_date(value).is_some(), params),
        Rule::FutureDate => {
            let passed = parse_date(value).is_some_and(|d| d > ctx.now);
            RuleOutcome::check(passed, params)
        }
        Rule::PastDate => {
            let passed = parse_date(value).is_some_and(|d| d < ctx.now);
            RuleOutcome::check(passed, params)
        }
        Rule::MinDate(bound) => match parse_date_str(bound) {
            Some(min) => {
                let passed = parse_date(value).is_some_and(|d| d >= min);
                RuleOutcome::check(passed, params.with("min", bound))
            }
            None => RuleOutcome::Skipped(format!("invalid minDate option '{}'", bound)),
        },
        Rule::MaxDate(bound) => match parse_date_str(bound) {
            Some(max) => {
                let passed = parse_date(value).is_some_and(|d| d <= max);
                RuleOutcome::check(passed, params.with("max", bound))
            }
            None => RuleOutcome::Skipped(format!("invalid maxDate option '{}'", bound)),
        },
        Rule::MinItems(min) => RuleOutcome::check(item_count(value) >= *min, params.with("min", min)),
        Rule::MaxItems(max) => RuleOutcome::check(item_count(value) <= *max, params.with("max", max)),
        Rule::FileSize(max) => {
            let passed = files(value).iter().all(|f| file_size(f).map_or(true, |size| size <= *max));
            RuleOutcome::check(passed, params.with("max", format_bytes(*max)))
        }
        Rule::FileType(types) => {
            let passed = files(value).iter().all(|f| file_type_allowed(f, types));
            RuleOutcome::check(passed, params.with("types", types.join(", ")))
        }
        Rule::BeforeField(_) | Rule::AfterField(_) | Rule::ConfirmPassword(_) => RuleOutcome::Deferred,
        Rule::Custom { name, options } => evaluate_custom(name, options, value, field, ctx),
    }
}

fn evaluate_custom(
    name: &str,
    options: &Value,
    value: &Value,
    field: &FieldDefinition,
    ctx: &RuleContext<'_>,
) -> RuleOutcome {
    let Some(rule) = ctx.registry.get(name) else {
        return RuleOutcome::Skipped(format!("unknown validation rule '{}'", name));
    };
    let outcome = catch_unwind(AssertUnwindSafe(|| (rule.predicate)(value, options, ctx.values)));
    match outcome {
        Ok(Ok(passed)) => {
            let mut params = MessageParams::new();
            params.extend_from_options(options);
            RuleOutcome::check(passed, params)
        }
        Ok(Err(reason)) => RuleOutcome::Error(reason),
        Err(_) => RuleOutcome::Error(format!("rule '{}' panicked on field '{}'", name, field.id)),
    }
}

fn item_count(value: &Value) -> usize {
    match value {
        Value::Array(items) => items.len(),
        Value::Null => 0,
        _ => 1,
    }
}

fn files(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

fn file_size(file: &Value) -> Option<u64> {
    file.get("size").and_then(Value::as_u64)
}

/// Match a file (object with `name`/`type`, or a bare file name) against
/// extensions (`pdf`, `.pdf`) and MIME types (`image/png`, `image/*`)
fn file_type_allowed(file: &Value, allowed: &[String]) -> bool {
    let (name, mime) = match file {
        Value::String(name) => (name.as_str(), ""),
        Value::Object(_) => (
            file.get("name").and_then(Value::as_str).unwrap_or(""),
            file.get("type").and_then(Value::as_str).unwrap_or(""),
        ),
        _ => return false,
    };
    let name = name.to_lowercase();
    let mime = mime.to_lowercase();
    allowed.iter().any(|entry| {
        let entry = entry.trim().to_lowercase();
        if entry.contains('/') {
            match entry.strip_suffix("/*") {
                Some(family) => mime.starts_with(&format!("{}/", family)),
                None => mime == entry,
            }
        } else {
            let ext = entry.trim_start_matches('.');
            name.rsplit_once('.').is_some_and(|(_, actual)| actual == ext)
        }
    })
}
