//! Paginated plain-text report
//!
//! Each page starts with the form title and ends with a `Page x of y`
//! footer. Pages are separated by a form feed.

use crate::cells::{cell_text, columns, submitted_at_text};
use crate::ExportConfig;
use chrono::{DateTime, Utc};
use formkit_core::{Form, Submission};

const PAGE_BREAK: char = '\x0c';
/// Lines taken by the page header and footer
const CHROME_LINES: usize = 4;

pub fn to_report(
    form: &Form,
    submissions: &[Submission],
    config: &ExportConfig,
    generated_at: DateTime<Utc>,
) -> String {
    let width = config.report_page_width.max(20);
    let body_lines = config.report_lines_per_page.saturating_sub(CHROME_LINES).max(1);

    let mut body = vec![
        format!("Generated: {}", generated_at.format(&config.date_format)),
        format!("Responses: {}", submissions.len()),
        String::new(),
    ];
    let fields = columns(form);
    for submission in submissions {
        body.push(format!(
            "Submission {} ({})",
            submission.id,
            submitted_at_text(submission, &config.date_format)
        ));
        for field in &fields {
            let line = format!("  {}: {}", field.label, cell_text(submission.data.get(&field.id)));
            body.extend(wrap(&line, width, "    "));
        }
        body.push(String::new());
    }

    let pages: Vec<&[String]> = body.chunks(body_lines).collect();
    let total = pages.len();
    let rule = "=".repeat(width);

    let mut out = String::new();
    for (index, lines) in pages.into_iter().enumerate() {
        if index > 0 {
            out.push(PAGE_BREAK);
        }
        out.push_str(&truncate(&form.title, width));
        out.push('\n');
        out.push_str(&rule);
        out.push('\n');
        for line in lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&rule);
        out.push('\n');
        let footer = format!("Page {} of {}", index + 1, total);
        out.push_str(&format!("{footer:>width$}\n"));
    }
    out
}

/// Break `line` at spaces so no piece is wider than `width` characters.
/// Continuation pieces start with `indent`; overlong words are split.
fn wrap(line: &str, width: usize, indent: &str) -> Vec<String> {
    let lead = &line[..line.len() - line.trim_start().len()];
    let mut lines = Vec::new();
    let mut current = lead.to_string();
    let mut has_word = false;

    for word in line.split_whitespace() {
        if has_word && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::replace(&mut current, indent.to_string()));
            has_word = false;
        }
        if has_word {
            current.push(' ');
        }
        let mut rest = word;
        while current.chars().count() + rest.chars().count() > width {
            let room = width.saturating_sub(current.chars().count()).max(1);
            let split = rest.char_indices().nth(room).map_or(rest.len(), |(i, _)| i);
            current.push_str(&rest[..split]);
            lines.push(std::mem::replace(&mut current, indent.to_string()));
            rest = &rest[split..];
        }
        current.push_str(rest);
        has_word = true;
    }
    lines.push(current);
    lines
}

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}
