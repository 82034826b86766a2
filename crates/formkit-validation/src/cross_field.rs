//! Cross-field resolution
//!
//! Rules whose outcome depends on more than one value: password
//! confirmation, date ordering and conditional requirement. Runs after every
//! field has been validated on its own and never blocks field-level checks.
//!
//! A reference to a field id the form does not declare means the condition is
//! never met; it is not an error.

use crate::message::MessageParams;
use crate::registry::RuleRegistry;
use crate::result::ValidationIssue;
use formkit_core::field::{Condition, FieldDefinition, FieldDependency, Rule};
use formkit_core::value::{as_number, contains, is_answered, is_present, loose_eq, parse_date};
use formkit_core::{Form, Values};
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;

/// Evaluates relations between fields of one submission
pub struct CrossFieldResolver {
    registry: Arc<RuleRegistry>,
}

impl CrossFieldResolver {
    /// Resolver rendering messages through `registry`
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        Self { registry }
    }

    /// All cross-field issues for `values`, tagged with the dependent field's id
    pub fn resolve(&self, form: &Form, values: &Values) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for field in form.ordered_fields() {
            for rule in &field.validation_rules {
                if let Some(issue) = self.check_relation(form, field, rule, values) {
                    issues.push(issue);
                }
            }
            if !field.required && Self::is_required(form, field, values) && !answered(field, values) {
                let message = self.message(field, "conditionalRequired", MessageParams::new());
                issues.push(ValidationIssue::error("conditionalRequired", message).for_field(&field.id));
            }
        }
        issues
    }

    fn check_relation(
        &self,
        form: &Form,
        field: &FieldDefinition,
        rule: &Rule,
        values: &Values,
    ) -> Option<ValidationIssue> {
        let peer_id = rule.peer_field()?;
        let peer = form.field(peer_id)?;
        let own = values.get(&field.id).filter(|_| answered(field, values))?;
        let other = values.get(peer_id).filter(|_| answered(peer, values))?;

        let violated = match rule {
            Rule::ConfirmPassword(_) => !loose_eq(own, other),
            Rule::BeforeField(_) => compare_dates(own, other)? != Ordering::Less,
            Rule::AfterField(_) => compare_dates(own, other)? != Ordering::Greater,
            _ => return None,
        };
        if !violated {
            return None;
        }
        let params = MessageParams::new().with("other", &peer.label);
        let message = self.message(field, rule.name(), params);
        Some(ValidationIssue::error(rule.name(), message).for_field(&field.id))
    }

    fn message(&self, field: &FieldDefinition, rule: &str, params: MessageParams) -> String {
        let template = field
            .messages
            .get(rule)
            .cloned()
            .unwrap_or_else(|| self.registry.template(rule));
        self.registry.render(&template, &params.with("label", &field.label))
    }

    /// Whether `dependency` holds for the current values.
    ///
    /// False when the referenced field is not part of the form.
    pub fn is_condition_met(form: &Form, dependency: &FieldDependency, values: &Values) -> bool {
        let Some(target) = form.field(&dependency.on_field_id) else {
            return false;
        };
        let current = values.get(&target.id).unwrap_or(&Value::Null);
        let present = is_answered(target.field_type, current);
        let expected = &dependency.value;
        // Equality sees the raw value, so an unchecked checkbox equals `false`
        let equal = is_present(current) && loose_eq(current, expected);

        match dependency.condition {
            Condition::Equals => equal,
            Condition::NotEquals => !equal,
            Condition::Contains => present && contains(current, expected),
            Condition::GreaterThan => present && compare(current, expected) == Some(Ordering::Greater),
            Condition::LessThan => present && compare(current, expected) == Some(Ordering::Less),
            Condition::IsEmpty => !present,
            Condition::IsNotEmpty => present,
        }
    }

    /// Whether `field` must be answered given the current values
    pub fn is_required(form: &Form, field: &FieldDefinition, values: &Values) -> bool {
        field.required
            || field
                .dependencies
                .iter()
                .filter(|d| d.required_if_met)
                .any(|d| Self::is_condition_met(form, d, values))
    }

    /// Fields shown for the current values, in order.
    ///
    /// Dependencies that do not mark the field required act as visibility
    /// conditions; all of them must hold.
    pub fn visible_fields<'a>(form: &'a Form, values: &Values) -> Vec<&'a FieldDefinition> {
        form.ordered_fields()
            .into_iter()
            .filter(|field| {
                field
                    .dependencies
                    .iter()
                    .filter(|d| !d.required_if_met)
                    .all(|d| Self::is_condition_met(form, d, values))
            })
            .collect()
    }
}

fn answered(field: &FieldDefinition, values: &Values) -> bool {
    values
        .get(&field.id)
        .is_some_and(|v| is_answered(field.field_type, v))
}

/// Numeric comparison first, then dates
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (as_number(left), as_number(right)) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => compare_dates(left, right),
    }
}

fn compare_dates(left: &Value, right: &Value) -> Option<Ordering> {
    Some(parse_date(left)?.cmp(&parse_date(right)?))
}
