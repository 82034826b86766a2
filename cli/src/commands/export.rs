//! Export command

use crate::config::Config;
use crate::input::read_document;
use crate::output;
use anyhow::{Context, Result};
use chrono::Utc;
use formkit_core::{Form, Submission};
use formkit_export::{export, ExportFormat};
use std::fs;
use std::path::{Path, PathBuf};

pub fn handle(
    form_path: &Path,
    submissions_path: &Path,
    to: &str,
    output_path: Option<PathBuf>,
    config: &Config,
) -> Result<()> {
    let format: ExportFormat = to.parse()?;
    let form: Form = read_document(form_path)?;
    let submissions: Vec<Submission> = read_document(submissions_path)?;

    let file = export(format, &form, &submissions, &config.export, Utc::now())?;
    let path = output_path.unwrap_or_else(|| PathBuf::from(&file.file_name));
    fs::write(&path, &file.bytes).with_context(|| format!("writing {}", path.display()))?;

    output::success(&format!(
        "Exported {} submission(s) to {} ({}, {} bytes)",
        submissions.len(),
        path.display(),
        file.mime_type(),
        file.bytes.len()
    ));
    Ok(())
}
