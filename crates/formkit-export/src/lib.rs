//! formkit export
//!
//! Turns a form's submissions into downloadable files and renders
//! notification emails.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                      formkit-export                        │
//! │                                                           │
//! │   Form + submissions ──► ExportFormat ──┬──► CSV          │
//! │                                         ├──► JSON         │
//! │                                         ├──► Excel (xlsx) │
//! │                                         └──► Text report  │
//! │                                   │                       │
//! │                                   ▼                       │
//! │                             BlobStorage (upload)          │
//! │                                                           │
//! │   NotificationSettings ──► TemplateRenderer ──► Transport │
//! └───────────────────────────────────────────────────────────┘
//! ```

pub mod cells;
pub mod csv_export;
pub mod email;
pub mod error;
pub mod json_export;
pub mod report;
pub mod xlsx;

pub use email::{
    compose_notifications, notify, EmailMessage, EmailTransport, InMemoryOutbox, TemplateRenderer,
};
pub use error::{ExportError, ExportResult};
pub use json_export::ExportedSubmission;

use chrono::{DateTime, Utc};
use formkit_core::ports::{BlobStorage, ProgressSender, StoredObject};
use formkit_core::{Form, Submission};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Export configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// chrono format string for timestamps
    pub date_format: String,
    /// Worksheet name in Excel exports
    pub sheet_name: String,
    /// Characters per report line
    pub report_page_width: usize,
    /// Lines per report page, header and footer included
    pub report_lines_per_page: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            date_format: "%Y-%m-%d %H:%M:%S".to_string(),
            sheet_name: "Submissions".to_string(),
            report_page_width: 80,
            report_lines_per_page: 60,
        }
    }
}

/// Export file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Excel,
    Pdf,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Excel => "xlsx",
            Self::Pdf => "txt",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Json => "application/json",
            Self::Excel => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Pdf => "text/plain",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Excel => "excel",
            Self::Pdf => "pdf",
        };
        f.write_str(name)
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "excel" | "xlsx" => Ok(Self::Excel),
            "pdf" | "report" => Ok(Self::Pdf),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// A rendered export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFile {
    pub file_name: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

impl ExportedFile {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Render `submissions` in `format`
pub fn export(
    format: ExportFormat,
    form: &Form,
    submissions: &[Submission],
    config: &ExportConfig,
    generated_at: DateTime<Utc>,
) -> ExportResult<ExportedFile> {
    let bytes = match format {
        ExportFormat::Csv => csv_export::to_csv(form, submissions, config)?.into_bytes(),
        ExportFormat::Json => json_export::to_json(form, submissions)?.into_bytes(),
        ExportFormat::Excel => xlsx::to_xlsx(form, submissions, config)?,
        ExportFormat::Pdf => report::to_report(form, submissions, config, generated_at).into_bytes(),
    };
    info!(form_id = %form.id, %format, submissions = submissions.len(), bytes = bytes.len(), "Exported submissions");
    Ok(ExportedFile {
        file_name: file_name(form, format, generated_at),
        format,
        bytes,
    })
}

/// `<title-slug>-<yyyymmdd-hhmmss>.<ext>`
pub fn file_name(form: &Form, format: ExportFormat, generated_at: DateTime<Utc>) -> String {
    let mut slug = String::new();
    for c in form.title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    let slug = if slug.is_empty() { form.id.as_str() } else { slug };
    format!("{}-{}.{}", slug, generated_at.format("%Y%m%d-%H%M%S"), format.extension())
}

/// Store an export under `exports/<form id>/`
pub async fn upload(
    storage: &dyn BlobStorage,
    form: &Form,
    file: ExportedFile,
    progress: Option<ProgressSender>,
) -> ExportResult<StoredObject> {
    let path = format!("exports/{}/{}", form.id, file.file_name);
    let stored = storage.upload(file.bytes, &path, progress).await?;
    info!(path = %stored.path, size = stored.size, "Uploaded export");
    Ok(stored)
}
