//! Form submissions

use crate::form::Form;
use crate::value::{is_answered, Values};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Submission context captured by the client
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionMetadata {
    /// When the submission was received
    pub submitted_at: DateTime<Utc>,
    /// When the submitter opened the form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Share of form fields answered, 0-100
    #[serde(default)]
    pub completion_percentage: f64,
    /// Seconds between opening the form and submitting it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time_secs: Option<f64>,
    /// Browser user agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Page the submitter came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    /// Client address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// Experiment variant the submitter saw
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl SubmissionMetadata {
    /// Metadata with only the submit time set
    pub fn at(submitted_at: DateTime<Utc>) -> Self {
        Self {
            submitted_at,
            started_at: None,
            completion_percentage: 0.0,
            completion_time_secs: None,
            user_agent: None,
            referrer: None,
            ip_address: None,
            variant: None,
        }
    }
}

/// One user's answers to a form. Immutable once stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    /// Unique submission id
    pub id: String,
    /// Form the answers belong to
    pub form_id: String,
    /// Answers keyed by field id
    pub data: Values,
    /// Client context
    pub metadata: SubmissionMetadata,
}

impl Submission {
    /// Build a submission for `form`, computing its completion percentage
    pub fn for_form(form: &Form, data: Values, submitted_at: DateTime<Utc>) -> Self {
        let mut metadata = SubmissionMetadata::at(submitted_at);
        metadata.completion_percentage = completion_percentage(form, &data);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            form_id: form.id.clone(),
            data,
            metadata,
        }
    }

    /// Replace the generated id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Record when the submitter opened the form
    pub fn started_at(mut self, started_at: DateTime<Utc>) -> Self {
        let elapsed = self.metadata.submitted_at - started_at;
        self.metadata.started_at = Some(started_at);
        self.metadata.completion_time_secs = Some(elapsed.num_milliseconds().max(0) as f64 / 1000.0);
        self
    }

    /// Tag the submission with an experiment variant
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.metadata.variant = Some(variant.into());
        self
    }

    /// When the submission was received
    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.metadata.submitted_at
    }
}

/// Percentage (0-100) of the form's fields answered in `data`
pub fn completion_percentage(form: &Form, data: &Values) -> f64 {
    if form.fields.is_empty() {
        return 0.0;
    }
    let answered = form
        .fields
        .iter()
        .filter(|f| data.get(&f.id).is_some_and(|v| is_answered(f.field_type, v)))
        .count();
    answered as f64 / form.fields.len() as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldDefinition, FieldType};
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    #[test]
    fn test_completion_percentage() {
        let mut form = Form::with_id("f", "Survey");
        for id in ["a", "b", "c", "d"] {
            form.add_field(FieldDefinition::new(id, FieldType::Text, id)).unwrap();
        }
        let data: Values = [
            ("a".to_string(), json!("yes")),
            ("b".to_string(), json!("  ")),
            ("c".to_string(), json!(0)),
        ]
        .into_iter()
        .collect();

        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let submission = Submission::for_form(&form, data, at).started_at(at - Duration::seconds(90));

        assert_eq!(submission.form_id, "f");
        assert_eq!(submission.metadata.completion_percentage, 50.0);
        assert_eq!(submission.metadata.completion_time_secs, Some(90.0));
    }

    #[test]
    fn test_metadata_json_shape() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let json = serde_json::to_value(SubmissionMetadata::at(at)).unwrap();
        assert!(json.get("submittedAt").is_some());
        assert!(json.get("variant").is_none());
    }
}
