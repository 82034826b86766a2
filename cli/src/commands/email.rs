//! Email rendering commands

use crate::input::read_document;
use crate::output::{self, OutputFormat};
use crate::EmailCommands;
use anyhow::{Context, Result};
use formkit_core::{Form, Submission};
use formkit_export::email::TemplateContext;
use formkit_export::{notify, EmailMessage, InMemoryOutbox, TemplateRenderer};
use std::fs;
use tabled::Tabled;

#[derive(Tabled)]
struct MessageRow {
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "Subject")]
    subject: String,
    #[tabled(rename = "Body")]
    body: String,
}

impl From<&EmailMessage> for MessageRow {
    fn from(message: &EmailMessage) -> Self {
        Self {
            to: message.to.clone(),
            subject: message.subject.clone(),
            body: message.body.clone(),
        }
    }
}

pub async fn handle(action: EmailCommands, format: OutputFormat) -> Result<()> {
    let renderer = TemplateRenderer::new();
    match action {
        EmailCommands::Template { template, context } => {
            let text = fs::read_to_string(&template).with_context(|| format!("reading {}", template.display()))?;
            let context: TemplateContext = read_document(&context)?;
            print!("{}", renderer.render(&text, &context));
        }
        EmailCommands::Notifications { form, submission } => {
            let form: Form = read_document(&form)?;
            let submission: Submission = read_document(&submission)?;
            // Nothing leaves the machine: messages go to an in-memory outbox
            let outbox = InMemoryOutbox::new();
            let count = notify(&outbox, &renderer, &form, &submission).await?;
            let sent = outbox.sent();
            format.emit(&sent, || sent.iter().map(MessageRow::from).collect())?;
            if format.is_table() && count == 0 {
                output::warning("Form has no notifications configured");
            }
        }
    }
    Ok(())
}
