//! Excel export

use crate::cells::{cell_text, columns, numeric_cell, submitted_at_text};
use crate::error::ExportResult;
use crate::ExportConfig;
use formkit_core::{Form, Submission};
use rust_xlsxwriter::{Color, Format, Workbook};

/// Build an `.xlsx` workbook with one row per submission
pub fn to_xlsx(form: &Form, submissions: &[Submission], config: &ExportConfig) -> ExportResult<Vec<u8>> {
    let fields = columns(form);
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(&config.sheet_name)?;

    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0x4472C4))
        .set_font_color(Color::White);

    let mut headers = vec!["ID".to_string(), "Submitted At".to_string()];
    headers.extend(fields.iter().map(|f| f.label.clone()));
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, header, &header_format)?;
    }

    for (index, submission) in submissions.iter().enumerate() {
        let row = index as u32 + 1;
        sheet.write_string(row, 0, &submission.id)?;
        sheet.write_string(row, 1, &submitted_at_text(submission, &config.date_format))?;
        for (offset, field) in fields.iter().enumerate() {
            let col = offset as u16 + 2;
            let value = submission.data.get(&field.id);
            match numeric_cell(field, value) {
                Some(number) => sheet.write_number(row, col, number)?,
                None => sheet.write_string(row, col, &cell_text(value))?,
            };
        }
    }

    sheet.autofit();
    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use formkit_core::{FieldDefinition, FieldType, Values};
    use serde_json::json;

    #[test]
    fn test_workbook_is_a_zip_archive() {
        let mut form = Form::with_id("f", "F");
        form.add_field(FieldDefinition::new("qty", FieldType::Number, "Qty")).unwrap();
        form.add_field(FieldDefinition::new("name", FieldType::Text, "Name")).unwrap();
        let data: Values = [("qty".to_string(), json!("4")), ("name".to_string(), json!("Ada"))]
            .into_iter()
            .collect();
        let submissions = vec![Submission::for_form(&form, data, Utc::now())];

        let bytes = to_xlsx(&form, &submissions, &ExportConfig::default()).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
