//! Notification emails
//!
//! Templates support `{{name}}` substitution and `{{#if name}}...{{/if}}`
//! blocks. A block is kept when `name` is present under the usual presence
//! rule. Blocks do not nest and there are no loops.

use crate::cells::{cell_text, columns};
use async_trait::async_trait;
use formkit_core::value::{as_text, is_present};
use formkit_core::{Form, NotificationSettings, PortResult, Submission};
use parking_lot::RwLock;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};

/// Body used by notifications without a template
pub const DEFAULT_BODY: &str = "A new response was submitted to {{formTitle}}.\n\
\n\
Submission: {{submissionId}}\n\
Submitted at: {{submittedAt}}\n\
{{#if responses}}\n\
Responses:\n\
{{responses}}{{/if}}";

/// Template variables by name
pub type TemplateContext = HashMap<String, Value>;

/// Renders notification templates
pub struct TemplateRenderer {
    variable: Regex,
    block: Regex,
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self {
            variable: Regex::new(r"\{\{\s*([\w.-]+)\s*\}\}").expect("built-in variable pattern"),
            block: Regex::new(r"(?s)\{\{#if\s+([\w.-]+)\s*\}\}(.*?)\{\{/if\}\}").expect("built-in block pattern"),
        }
    }

    pub fn render(&self, template: &str, context: &TemplateContext) -> String {
        let blocks = self.block.replace_all(template, |caps: &Captures| {
            let keep = context.get(&caps[1]).is_some_and(is_present);
            if keep {
                caps[2].to_string()
            } else {
                String::new()
            }
        });
        self.variable
            .replace_all(&blocks, |caps: &Captures| {
                context.get(&caps[1]).map(as_text).unwrap_or_default()
            })
            .into_owned()
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Outgoing email
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Variables available to notification templates.
///
/// Field answers are available by field id; the built-in names
/// `formTitle`, `formId`, `submissionId`, `submittedAt` and `responses`
/// take precedence over a field with the same id.
pub fn notification_context(form: &Form, submission: &Submission, include_responses: bool) -> TemplateContext {
    let mut context: TemplateContext = submission
        .data
        .iter()
        .map(|(id, value)| (id.clone(), value.clone()))
        .collect();

    let responses = if include_responses {
        columns(form)
            .into_iter()
            .filter(|field| submission.data.get(&field.id).is_some_and(is_present))
            .map(|field| format!("{}: {}\n", field.label, cell_text(submission.data.get(&field.id))))
            .collect::<String>()
    } else {
        String::new()
    };

    context.insert("formTitle".into(), Value::String(form.title.clone()));
    context.insert("formId".into(), Value::String(form.id.clone()));
    context.insert("submissionId".into(), Value::String(submission.id.clone()));
    context.insert(
        "submittedAt".into(),
        Value::String(submission.submitted_at().to_rfc3339()),
    );
    context.insert("responses".into(), Value::String(responses));
    context
}

/// One message per notification configured on the form
pub fn compose_notifications(
    renderer: &TemplateRenderer,
    form: &Form,
    submission: &Submission,
) -> Vec<EmailMessage> {
    form.settings
        .notifications
        .iter()
        .map(|settings| compose(renderer, form, submission, settings))
        .collect()
}

fn compose(
    renderer: &TemplateRenderer,
    form: &Form,
    submission: &Submission,
    settings: &NotificationSettings,
) -> EmailMessage {
    let context = notification_context(form, submission, settings.include_responses);
    let template = settings.template.as_deref().unwrap_or(DEFAULT_BODY);
    EmailMessage {
        to: settings.email.clone(),
        subject: renderer.render(&settings.subject, &context),
        body: renderer.render(template, &context),
    }
}

/// Outbound email port
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, message: EmailMessage) -> PortResult<()>;
}

/// Transport that keeps sent messages in memory
#[derive(Default)]
pub struct InMemoryOutbox {
    sent: RwLock<Vec<EmailMessage>>,
}

impl InMemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.read().clone()
    }
}

#[async_trait]
impl EmailTransport for InMemoryOutbox {
    async fn send(&self, message: EmailMessage) -> PortResult<()> {
        debug!(to = %message.to, subject = %message.subject, "Queued email");
        self.sent.write().push(message);
        Ok(())
    }
}

/// Compose and send the form's notifications for a submission.
///
/// Stops at the first transport error. Returns the number of messages sent.
pub async fn notify(
    transport: &dyn EmailTransport,
    renderer: &TemplateRenderer,
    form: &Form,
    submission: &Submission,
) -> PortResult<usize> {
    let messages = compose_notifications(renderer, form, submission);
    let count = messages.len();
    for message in messages {
        transport.send(message).await?;
    }
    if count > 0 {
        info!(form_id = %form.id, submission_id = %submission.id, count, "Sent submission notifications");
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use formkit_core::{FieldDefinition, FieldType, PortError, Values};
    use serde_json::json;

    fn context(pairs: &[(&str, Value)]) -> TemplateContext {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_substitution() {
        let renderer = TemplateRenderer::new();
        let ctx = context(&[("name", json!("Ada")), ("count", json!(3))]);
        assert_eq!(renderer.render("Hi {{name}}, {{ count }} new", &ctx), "Hi Ada, 3 new");
        assert_eq!(renderer.render("Hi {{missing}}!", &ctx), "Hi !");
    }

    #[test]
    fn test_conditional_blocks() {
        let renderer = TemplateRenderer::new();
        let ctx = context(&[("company", json!("Acme")), ("empty", json!("")), ("zero", json!(0))]);
        let template = "A{{#if company}} at {{company}}{{/if}}{{#if empty}} never{{/if}}{{#if zero}} z{{/if}}{{#if nope}} n{{/if}}";
        assert_eq!(renderer.render(template, &ctx), "A at Acme z");
    }

    fn form() -> Form {
        let mut form = Form::with_id("contact", "Contact us");
        form.add_field(FieldDefinition::new("name", FieldType::Text, "Name")).unwrap();
        form.add_field(FieldDefinition::new("topic", FieldType::Text, "Topic")).unwrap();
        form.settings.notifications = vec![
            NotificationSettings {
                email: "team@example.com".into(),
                subject: "New message from {{name}}".into(),
                include_responses: true,
                template: None,
            },
            NotificationSettings {
                email: "audit@example.com".into(),
                subject: "Submission {{submissionId}}".into(),
                include_responses: false,
                template: Some("{{formId}}{{#if responses}} has responses{{/if}}".into()),
            },
        ];
        form
    }

    fn submission(form: &Form) -> Submission {
        let data: Values = [("name".to_string(), json!("Ada"))].into_iter().collect();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Submission::for_form(form, data, at).with_id("s1")
    }

    #[test]
    fn test_compose_notifications() {
        let form = form();
        let messages = compose_notifications(&TemplateRenderer::new(), &form, &submission(&form));
        assert_eq!(messages.len(), 2);

        assert_eq!(messages[0].to, "team@example.com");
        assert_eq!(messages[0].subject, "New message from Ada");
        assert!(messages[0].body.contains("Contact us"));
        assert!(messages[0].body.contains("Responses:\nName: Ada\n"));
        assert!(!messages[0].body.contains("Topic"));

        assert_eq!(messages[1].subject, "Submission s1");
        assert_eq!(messages[1].body, "contact");
    }

    #[tokio::test]
    async fn test_notify_sends_through_transport() {
        let form = form();
        let outbox = InMemoryOutbox::new();
        let sent = notify(&outbox, &TemplateRenderer::new(), &form, &submission(&form)).await.unwrap();
        assert_eq!(sent, 2);
        assert_eq!(outbox.sent().len(), 2);
    }

    struct Failing;

    #[async_trait]
    impl EmailTransport for Failing {
        async fn send(&self, _message: EmailMessage) -> PortResult<()> {
            Err(PortError::Transport("smtp down".into()))
        }
    }

    #[tokio::test]
    async fn test_transport_errors_are_returned() {
        let form = form();
        let result = notify(&Failing, &TemplateRenderer::new(), &form, &submission(&form)).await;
        assert_eq!(result, Err(PortError::Transport("smtp down".into())));
    }
}
