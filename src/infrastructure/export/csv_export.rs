// ============================================================
// CSV EXPORTER
// ============================================================
// One row per step (test-management import layout) or one row per case

use crate::domain::app_config::CsvLayout;
use crate::domain::error::{AppError, Result};
use crate::domain::test_case::TestCase;
use chrono::SecondsFormat;
use csv::{QuoteStyle, Writer, WriterBuilder};
use std::io::Write;
use std::path::Path;

pub const CSV_HEADERS: [&str; 12] = [
    "Title",
    "Preconditions",
    "Test Step #",
    "Test Step Action",
    "Test Step Expected Result",
    "Test Type",
    "Design Technique",
    "API Path",
    "HTTP Method",
    "Priority",
    "Description",
    "Created Date",
];

#[derive(Default)]
pub struct CsvExporter {
    layout: CsvLayout,
}

impl CsvExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(mut self, layout: CsvLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn write_file(&self, path: &Path, cases: &[TestCase]) -> Result<()> {
        let file = std::fs::File::create(path).map_err(|e| {
            AppError::ExportError(format!("Failed to create {}: {}", path.display(), e))
        })?;
        let rows = self.write(file, cases)?;
        tracing::debug!(path = %path.display(), rows, "csv rows written");
        Ok(())
    }

    /// Writes header and rows; returns the number of data rows.
    pub fn write<W: Write>(&self, target: W, cases: &[TestCase]) -> Result<usize> {
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Necessary)
            .from_writer(target);
        write_record(&mut writer, CSV_HEADERS)?;

        let mut rows = 0;
        for case in cases {
            rows += match self.layout {
                CsvLayout::RowPerStep => write_step_rows(&mut writer, case)?,
                CsvLayout::Concatenated => write_case_row(&mut writer, case)?,
            };
        }
        writer
            .flush()
            .map_err(|e| AppError::ExportError(format!("Failed to flush CSV: {}", e)))?;
        Ok(rows)
    }
}

fn write_step_rows<W: Write>(writer: &mut Writer<W>, case: &TestCase) -> Result<usize> {
    let created = created_date(case);
    let priority = priority(case);
    for (index, step) in case.test_steps.iter().enumerate() {
        let first = index == 0;
        let number = (index + 1).to_string();
        write_record(
            writer,
            [
                if first { case.title.as_str() } else { "" },
                if first { case.preconditions.as_str() } else { "" },
                number.as_str(),
                step.action.as_str(),
                step.expected_result.as_str(),
                case.test_type.as_str(),
                case.design_technique.label(),
                case.operation.path.as_str(),
                case.operation.method.as_str(),
                priority,
                if first { case.description.as_str() } else { "" },
                if first { created.as_str() } else { "" },
            ],
        )?;
    }
    Ok(case.test_steps.len())
}

fn write_case_row<W: Write>(writer: &mut Writer<W>, case: &TestCase) -> Result<usize> {
    let numbers = (1..=case.test_steps.len())
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    let actions = numbered(case.test_steps.iter().map(|step| step.action.as_str()));
    let expected = numbered(case.test_steps.iter().map(|step| step.expected_result.as_str()));
    let created = created_date(case);
    write_record(
        writer,
        [
            case.title.as_str(),
            case.preconditions.as_str(),
            numbers.as_str(),
            actions.as_str(),
            expected.as_str(),
            case.test_type.as_str(),
            case.design_technique.label(),
            case.operation.path.as_str(),
            case.operation.method.as_str(),
            priority(case),
            case.description.as_str(),
            created.as_str(),
        ],
    )?;
    Ok(1)
}

fn numbered<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items
        .enumerate()
        .map(|(index, text)| format!("{}. {}", index + 1, text))
        .collect::<Vec<_>>()
        .join("\n")
}

fn priority(case: &TestCase) -> &'static str {
    case.priority.map(|priority| priority.as_str()).unwrap_or("")
}

fn created_date(case: &TestCase) -> String {
    case.created_date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn write_record<W: Write>(writer: &mut Writer<W>, record: [&str; 12]) -> Result<()> {
    writer
        .write_record(record)
        .map_err(|e| AppError::ExportError(format!("Failed to write CSV row: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::export::fixtures::case;
    use csv::ReaderBuilder;

    fn rows(exporter: &CsvExporter, cases: &[TestCase]) -> Vec<Vec<String>> {
        let mut buffer = Vec::new();
        exporter.write(&mut buffer, cases).unwrap();
        ReaderBuilder::new()
            .has_headers(false)
            .from_reader(buffer.as_slice())
            .records()
            .map(|record| record.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_header_order() {
        let rows = rows(&CsvExporter::new(), &[]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], CSV_HEADERS.map(str::to_string).to_vec());
    }

    #[test]
    fn test_row_per_step_blanks_case_columns_after_first_row() {
        let rows = rows(&CsvExporter::new(), &[case("Age above maximum", 2)]);
        assert_eq!(rows.len(), 3);
        let first = &rows[1];
        let second = &rows[2];
        assert_eq!(first[0], "Age above maximum");
        assert_eq!(first[2], "1");
        assert_eq!(first[6], "BVA");
        assert_eq!(first[7], "/users");
        assert_eq!(first[8], "POST");
        assert_eq!(first[9], "High");
        assert_eq!(first[11], "2024-05-01T12:30:00Z");
        assert_eq!(second[0], "");
        assert_eq!(second[1], "");
        assert_eq!(second[2], "2");
        assert_eq!(second[3], "Send request 2");
        assert_eq!(second[5], "Negative");
        assert_eq!(second[10], "");
        assert_eq!(second[11], "");
    }

    #[test]
    fn test_concatenated_layout_numbers_steps() {
        let exporter = CsvExporter::new().with_layout(CsvLayout::Concatenated);
        let rows = rows(&exporter, &[case("a", 2), case("b", 1)]);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][2], "1\n2");
        assert_eq!(rows[1][3], "1. Send request 1\n2. Send request 2");
        assert_eq!(rows[1][4], "1. Status 201\n2. Status 202");
        assert_eq!(rows[2][0], "b");
    }

    #[test]
    fn test_quoting() {
        let mut tricky = case("Name with, comma", 1);
        tricky.test_steps[0].action = "Send \"quoted\" body".to_string();
        let mut buffer = Vec::new();
        CsvExporter::new().write(&mut buffer, &[tricky]).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("Title,Preconditions,"));
        assert!(text.contains("\"Send \"\"quoted\"\" body\""));
        assert!(text.contains("\"Name with, comma\""));
    }
}
