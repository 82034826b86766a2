//! Field definitions, validation rules and dependencies

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Input type of a field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Single line text
    Text,
    /// Numeric input
    Number,
    /// Email address
    Email,
    /// Date or date-time
    Date,
    /// Dropdown with one choice
    Select,
    /// Single checkbox, or a group when options are set
    Checkbox,
    /// Radio group
    Radio,
    /// File upload; the value is the stored object
    File,
    /// Multi-line text
    Textarea,
}

impl FieldType {
    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Email => "email",
            Self::Date => "date",
            Self::Select => "select",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::File => "file",
            Self::Textarea => "textarea",
        }
    }

    /// Whether the field offers a fixed list of choices
    pub fn has_choices(&self) -> bool {
        matches!(self, Self::Select | Self::Radio)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validation rule with its typed options.
///
/// Serialized as `{"rule": "<name>", "value": <options>}`; unit rules omit `value`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", content = "value", rename_all = "camelCase")]
pub enum Rule {
    /// Minimum length in characters (or items for lists)
    MinLength(usize),
    /// Maximum length in characters (or items for lists)
    MaxLength(usize),
    /// Minimum numeric value
    Min(f64),
    /// Maximum numeric value
    Max(f64),
    /// Regular expression the text must match
    Pattern(String),
    /// Email address format
    Email,
    /// http(s) URL format
    Url,
    /// Phone number format
    Phone,
    /// Any number
    Numeric,
    /// Whole number
    Integer,
    /// Parseable date
    Date,
    /// Date strictly after now
    FutureDate,
    /// Date strictly before now
    PastDate,
    /// Earliest allowed date (inclusive)
    MinDate(String),
    /// Latest allowed date (inclusive)
    MaxDate(String),
    /// Minimum number of selected items
    MinItems(usize),
    /// Maximum number of selected items
    MaxItems(usize),
    /// Maximum file size in bytes
    FileSize(u64),
    /// Allowed file extensions or MIME types
    FileType(Vec<String>),
    /// Date must be strictly earlier than another field's date
    BeforeField(String),
    /// Date must be strictly later than another field's date
    AfterField(String),
    /// Value must equal another (password) field when both are filled
    ConfirmPassword(String),
    /// Rule registered by name in the rule registry
    Custom {
        /// Registered rule name
        name: String,
        /// Options handed to the predicate
        #[serde(default)]
        options: Value,
    },
}

impl Rule {
    /// Rule name as it appears in errors and message templates
    pub fn name(&self) -> &str {
        match self {
            Self::MinLength(_) => "minLength",
            Self::MaxLength(_) => "maxLength",
            Self::Min(_) => "min",
            Self::Max(_) => "max",
            Self::Pattern(_) => "pattern",
            Self::Email => "email",
            Self::Url => "url",
            Self::Phone => "phone",
            Self::Numeric => "numeric",
            Self::Integer => "integer",
            Self::Date => "date",
            Self::FutureDate => "futureDate",
            Self::PastDate => "pastDate",
            Self::MinDate(_) => "minDate",
            Self::MaxDate(_) => "maxDate",
            Self::MinItems(_) => "minItems",
            Self::MaxItems(_) => "maxItems",
            Self::FileSize(_) => "fileSize",
            Self::FileType(_) => "fileType",
            Self::BeforeField(_) => "beforeField",
            Self::AfterField(_) => "afterField",
            Self::ConfirmPassword(_) => "confirmPassword",
            Self::Custom { name, .. } => name,
        }
    }

    /// Rules only the cross-field resolver can evaluate
    pub fn is_cross_field(&self) -> bool {
        matches!(
            self,
            Self::BeforeField(_) | Self::AfterField(_) | Self::ConfirmPassword(_)
        )
    }

    /// Id of the peer field this rule refers to, if any
    pub fn peer_field(&self) -> Option<&str> {
        match self {
            Self::BeforeField(id) | Self::AfterField(id) | Self::ConfirmPassword(id) => Some(id),
            _ => None,
        }
    }
}

/// Comparison applied to a referenced field's value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Loose equality with the operand
    Equals,
    /// Negation of `Equals`
    NotEquals,
    /// Substring or list membership
    Contains,
    /// Numeric or date comparison
    GreaterThan,
    /// Numeric or date comparison
    LessThan,
    /// No answer
    IsEmpty,
    /// Any answer
    IsNotEmpty,
}

/// Dependency of one field on another field's value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDependency {
    /// Field whose value is inspected
    pub on_field_id: String,
    /// Comparison to apply
    pub condition: Condition,
    /// Operand for the comparison (ignored by emptiness checks)
    #[serde(default)]
    pub value: Value,
    /// Dependent field becomes required when the condition holds
    #[serde(default)]
    pub required_if_met: bool,
}

impl FieldDependency {
    /// Dependency that only affects visibility
    pub fn new(on_field_id: impl Into<String>, condition: Condition, value: Value) -> Self {
        Self {
            on_field_id: on_field_id.into(),
            condition,
            value,
            required_if_met: false,
        }
    }

    /// Mark the dependent field as required when the condition holds
    pub fn requiring(mut self) -> Self {
        self.required_if_met = true;
        self
    }
}

/// Choice offered by select and radio fields
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    /// Text shown to the user
    pub label: String,
    /// Submitted value
    pub value: String,
}

impl FieldOption {
    /// Option with a label and a value
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A single input within a form
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    /// Unique id within the form
    pub id: String,
    /// Input type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Human readable label, used in messages
    pub label: String,
    /// Must be answered
    #[serde(default)]
    pub required: bool,
    /// Rules evaluated in list order
    #[serde(default)]
    pub validation_rules: Vec<Rule>,
    /// Position in the form
    #[serde(default)]
    pub order: u32,
    /// Conditions on other fields
    #[serde(default)]
    pub dependencies: Vec<FieldDependency>,
    /// Choices for select/radio/checkbox groups
    #[serde(default)]
    pub options: Vec<FieldOption>,
    /// Placeholder text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Per-rule message overrides keyed by rule name
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub messages: HashMap<String, String>,
}

impl FieldDefinition {
    /// Create an optional field with no rules
    pub fn new(id: impl Into<String>, field_type: FieldType, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            field_type,
            label: label.into(),
            required: false,
            validation_rules: Vec::new(),
            order: 0,
            dependencies: Vec::new(),
            options: Vec::new(),
            placeholder: None,
            messages: HashMap::new(),
        }
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Append a rule
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.validation_rules.push(rule);
        self
    }

    /// Set the display position
    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    /// Append a dependency
    pub fn with_dependency(mut self, dependency: FieldDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Set the choices
    pub fn with_options(mut self, options: Vec<FieldOption>) -> Self {
        self.options = options;
        self
    }

    /// Override the message template for one rule
    pub fn with_message(mut self, rule: impl Into<String>, template: impl Into<String>) -> Self {
        self.messages.insert(rule.into(), template.into());
        self
    }

    /// Whether `value` is one of the declared option values
    pub fn allows_option(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }
}
