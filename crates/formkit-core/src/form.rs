//! Form aggregate and builder operations

use crate::error::{FormError, FormResult};
use crate::field::{FieldDefinition, Rule};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Lifecycle of a form
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormStatus {
    /// Being edited, accepts test submissions
    #[default]
    Draft,
    /// Live
    Published,
    /// No longer accepting submissions
    Closed,
    /// Hidden and read-only
    Archived,
}

/// Who gets told about new submissions
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    /// Recipient address
    pub email: String,
    /// Subject template
    pub subject: String,
    /// Append every answer to the body
    #[serde(default)]
    pub include_responses: bool,
    /// Body template; the default notification body is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

/// Submission behaviour of a form
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormSettings {
    /// Label of the submit button
    pub submit_button_text: String,
    /// Shown after a successful submit
    pub success_message: String,
    /// Where to send the submitter afterwards
    pub redirect_url: Option<String>,
    /// Emails sent for each submission
    pub notifications: Vec<NotificationSettings>,
    /// Stop accepting after this many submissions
    pub limit_responses: Option<u64>,
    /// Stop accepting at this instant
    pub close_date: Option<DateTime<Utc>>,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            submit_button_text: "Submit".to_string(),
            success_message: "Thank you for your submission!".to_string(),
            redirect_url: None,
            notifications: Vec::new(),
            limit_responses: None,
            close_date: None,
        }
    }
}

/// A form: ordered fields plus settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    /// Unique form id
    pub id: String,
    /// Title shown above the form
    pub title: String,
    /// Optional intro text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Lifecycle state
    #[serde(default)]
    pub status: FormStatus,
    /// Fields in list order; `order` decides display
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    /// Submission behaviour
    #[serde(default)]
    pub settings: FormSettings,
    /// Creation time
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Last modification time
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// Configuration problem found by [`Form::lint`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintWarning {
    /// Field the warning is about
    pub field_id: String,
    /// Human readable problem
    pub message: String,
}

/// Partial update applied by the persistence port
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormPatch {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New status
    pub status: Option<FormStatus>,
    /// Replacement field list
    pub fields: Option<Vec<FieldDefinition>>,
    /// Replacement settings
    pub settings: Option<FormSettings>,
}

impl FormPatch {
    /// Apply the patch and bump `updated_at`
    pub fn apply(self, form: &mut Form) {
        if let Some(title) = self.title {
            form.title = title;
        }
        if let Some(description) = self.description {
            form.description = Some(description);
        }
        if let Some(status) = self.status {
            form.status = status;
        }
        if let Some(fields) = self.fields {
            form.fields = fields;
        }
        if let Some(settings) = self.settings {
            form.settings = settings;
        }
        form.touch();
    }
}

impl Form {
    /// Create an empty draft form
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: None,
            status: FormStatus::Draft,
            fields: Vec::new(),
            settings: FormSettings::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Same as [`Form::new`] with a caller chosen id
    pub fn with_id(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self { id: id.into(), ..Self::new(title) }
    }

    /// Look up a field by id
    pub fn field(&self, id: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Whether the form declares `id`
    pub fn has_field(&self, id: &str) -> bool {
        self.field(id).is_some()
    }

    /// Fields sorted by `order`; ties keep list position
    pub fn ordered_fields(&self) -> Vec<&FieldDefinition> {
        let mut fields: Vec<_> = self.fields.iter().collect();
        fields.sort_by_key(|f| f.order);
        fields
    }

    /// Append a field at the end of the form
    pub fn add_field(&mut self, mut field: FieldDefinition) -> FormResult<()> {
        if self.has_field(&field.id) {
            return Err(FormError::DuplicateField(field.id));
        }
        field.order = self
            .fields
            .iter()
            .map(|f| f.order + 1)
            .max()
            .unwrap_or(0);
        self.fields.push(field);
        self.touch();
        Ok(())
    }

    /// Edit a field in place. The field id cannot be changed.
    pub fn update_field<F>(&mut self, id: &str, edit: F) -> FormResult<()>
    where
        F: FnOnce(&mut FieldDefinition),
    {
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| FormError::FieldNotFound(id.to_string()))?;
        edit(field);
        field.id = id.to_string();
        self.touch();
        Ok(())
    }

    /// Remove a field and close the gap in `order`
    pub fn remove_field(&mut self, id: &str) -> FormResult<FieldDefinition> {
        let index = self
            .fields
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| FormError::FieldNotFound(id.to_string()))?;
        let removed = self.fields.remove(index);
        self.renumber();
        self.touch();
        Ok(removed)
    }

    /// Move the field at position `from` to position `to` (drag and drop)
    pub fn move_field(&mut self, from: usize, to: usize) -> FormResult<()> {
        let len = self.fields.len();
        for position in [from, to] {
            if position >= len {
                return Err(FormError::InvalidMove { position, len });
            }
        }
        self.renumber();
        let field = self.fields.remove(from);
        self.fields.insert(to, field);
        self.reindex();
        self.touch();
        Ok(())
    }

    /// Make the form live. Fails without fields.
    pub fn publish(&mut self) -> FormResult<()> {
        if self.fields.is_empty() {
            return Err(FormError::NoFields);
        }
        self.status = FormStatus::Published;
        self.touch();
        Ok(())
    }

    /// Stop accepting submissions
    pub fn close(&mut self) {
        self.status = FormStatus::Closed;
        self.touch();
    }

    /// Hide the form and stop accepting submissions
    pub fn archive(&mut self) {
        self.status = FormStatus::Archived;
        self.touch();
    }

    /// Check whether one more submission may be accepted
    pub fn ensure_accepting(&self, now: DateTime<Utc>, submission_count: u64) -> FormResult<()> {
        if matches!(self.status, FormStatus::Closed | FormStatus::Archived) {
            return Err(FormError::FormClosed);
        }
        if self.settings.close_date.is_some_and(|close| now >= close) {
            return Err(FormError::FormClosed);
        }
        if self
            .settings
            .limit_responses
            .is_some_and(|limit| submission_count >= limit)
        {
            return Err(FormError::ResponseLimitReached);
        }
        Ok(())
    }

    /// Report configuration problems without failing.
    ///
    /// Validators skip whatever is reported here; the list is for the builder UI.
    pub fn lint(&self) -> Vec<LintWarning> {
        let mut warnings = Vec::new();
        let mut seen = HashSet::new();
        let mut warn = |field_id: &str, message: String| {
            tracing::warn!(field_id, "{}", message);
            warnings.push(LintWarning { field_id: field_id.to_string(), message });
        };

        for field in &self.fields {
            if !seen.insert(field.id.as_str()) {
                warn(&field.id, format!("duplicate field id '{}'", field.id));
            }
            for dependency in &field.dependencies {
                if dependency.on_field_id == field.id {
                    warn(&field.id, "field depends on itself".to_string());
                } else if !self.has_field(&dependency.on_field_id) {
                    warn(
                        &field.id,
                        format!("dependency on unknown field '{}'", dependency.on_field_id),
                    );
                }
            }
            for rule in &field.validation_rules {
                if let Some(peer) = rule.peer_field() {
                    if !self.has_field(peer) {
                        warn(
                            &field.id,
                            format!("rule '{}' refers to unknown field '{}'", rule.name(), peer),
                        );
                    }
                }
                if let Rule::Pattern(pattern) = rule {
                    if let Err(e) = Regex::new(pattern) {
                        warn(&field.id, format!("invalid pattern '{}': {}", pattern, e));
                    }
                }
            }
            if field.field_type.has_choices() && field.options.is_empty() {
                warn(&field.id, format!("{} field has no options", field.field_type));
            }
        }
        warnings
    }

    fn renumber(&mut self) {
        self.fields.sort_by_key(|f| f.order);
        self.reindex();
    }

    /// `order` follows list position
    fn reindex(&mut self) {
        for (index, field) in self.fields.iter_mut().enumerate() {
            field.order = index as u32;
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
