//! CSV export
//!
//! Every cell is double-quoted, embedded quotes are doubled and rows end
//! with `\n`. Header: `id`, `submittedAt`, then field labels in order.

use crate::cells::{cell_text, columns, submitted_at_text};
use crate::error::ExportResult;
use crate::ExportConfig;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use formkit_core::{Form, Submission};

pub fn to_csv(form: &Form, submissions: &[Submission], config: &ExportConfig) -> ExportResult<String> {
    let fields = columns(form);
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let mut header = vec!["id".to_string(), "submittedAt".to_string()];
    header.extend(fields.iter().map(|f| f.label.clone()));
    writer.write_record(&header)?;

    for submission in submissions {
        let mut row = vec![
            submission.id.clone(),
            submitted_at_text(submission, &config.date_format),
        ];
        row.extend(fields.iter().map(|f| cell_text(submission.data.get(&f.id))));
        writer.write_record(&row)?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use formkit_core::{FieldDefinition, FieldType, Values};
    use serde_json::json;

    #[test]
    fn test_quotes_every_cell() {
        let mut form = Form::with_id("f", "Feedback");
        form.add_field(FieldDefinition::new("name", FieldType::Text, "Name")).unwrap();
        form.add_field(FieldDefinition::new("comment", FieldType::Textarea, "Comment")).unwrap();
        let data: Values = [
            ("name".to_string(), json!("Ada")),
            ("comment".to_string(), json!("Said \"hi\", twice")),
        ]
        .into_iter()
        .collect();
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let submissions = vec![Submission::for_form(&form, data, at).with_id("s1")];

        let csv = to_csv(&form, &submissions, &ExportConfig::default()).unwrap();
        assert_eq!(
            csv,
            "\"id\",\"submittedAt\",\"Name\",\"Comment\"\n\
             \"s1\",\"2024-01-02 03:04:05\",\"Ada\",\"Said \"\"hi\"\", twice\"\n"
        );
    }

    #[test]
    fn test_missing_answers_are_empty_cells() {
        let mut form = Form::with_id("f", "F");
        form.add_field(FieldDefinition::new("a", FieldType::Text, "A")).unwrap();
        let submissions = vec![Submission::for_form(&form, Values::new(), Utc::now()).with_id("s")];
        let csv = to_csv(&form, &submissions, &ExportConfig::default()).unwrap();
        assert!(csv.lines().nth(1).unwrap().ends_with(",\"\""));
    }
}
