use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use chrono::{Duration, NaiveDate};
use tracing::info;

use super::ExtractedContent;
use crate::error::{DoctextError, Result};
use crate::models::DocumentType;

pub struct XlsxExtractor;

impl XlsxExtractor {
    pub fn extract_file(path: &Path, include_empty_rows: bool) -> Result<ExtractedContent> {
        let bytes = std::fs::read(path)
            .map_err(|e| DoctextError::Open(format!("{}: {e}", path.display())))?;
        Self::extract(&bytes, include_empty_rows)
    }

    pub fn extract(bytes: &[u8], include_empty_rows: bool) -> Result<ExtractedContent> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| DoctextError::Open(format!("XLSX parse error: {e}")))?;

        let sheets = workbook.worksheets();
        info!("Workbook opened: {} sheet(s) found.", sheets.len());

        let mut lines: Vec<String> = Vec::new();
        for (index, (name, range)) in sheets.iter().enumerate() {
            let sheet_number = index + 1;
            lines.push(format!("### Sheet {sheet_number}: {name} ###"));

            let rows = Self::sheet_rows(range, include_empty_rows);
            info!(
                "Processed Sheet {} - Rows extracted: {}",
                sheet_number,
                rows.len()
            );
            lines.extend(rows);
            lines.push(String::new());
        }

        let text = lines.join("\n").trim().to_string();
        Ok(ExtractedContent::new(text, DocumentType::Xlsx))
    }

    /// Tab-joined rows from A1 to the last used cell.
    fn sheet_rows(range: &Range<Data>, include_empty_rows: bool) -> Vec<String> {
        let Some((last_row, last_col)) = range.end() else {
            return Vec::new();
        };

        let mut rows = Vec::new();
        for row in 0..=last_row {
            let cells: Vec<String> = (0..=last_col)
                .map(|col| Self::format_cell_value(range.get_value((row, col))))
                .collect();
            if !include_empty_rows && cells.iter().all(|c| c.is_empty()) {
                continue;
            }
            rows.push(cells.join("\t"));
        }
        rows
    }

    fn format_cell_value(cell: Option<&Data>) -> String {
        let value = match cell {
            Some(Data::String(s)) => s.clone(),
            Some(Data::Int(i)) => i.to_string(),
            Some(Data::Float(f)) => Self::format_float(*f),
            Some(Data::Bool(b)) => if *b { "True" } else { "False" }.to_string(),
            Some(Data::DateTime(dt)) => {
                Self::excel_serial_to_iso(dt.as_f64()).unwrap_or_else(|| dt.as_f64().to_string())
            }
            Some(Data::DateTimeIso(dt)) => dt.clone(),
            Some(Data::DurationIso(d)) => d.clone(),
            Some(Data::Error(e)) => e.to_string(),
            Some(Data::Empty) | None => String::new(),
        };
        value.trim().to_string()
    }

    fn format_float(f: f64) -> String {
        if f.fract() == 0.0 && f.abs() < 1e15 {
            format!("{}", f as i64)
        } else {
            format!("{f}")
        }
    }

    /// Serial days since 1899-12-30; midnight values print as a date only.
    fn excel_serial_to_iso(serial: f64) -> Option<String> {
        let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
        let millis = (serial * 86_400_000.0).round() as i64;
        let dt = epoch.checked_add_signed(Duration::milliseconds(millis))?;
        if serial.fract() == 0.0 {
            Some(dt.format("%Y-%m-%d").to_string())
        } else {
            Some(dt.format("%Y-%m-%d %H:%M:%S").to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::CellErrorType;

    #[test]
    fn test_format_cell_value() {
        assert_eq!(
            XlsxExtractor::format_cell_value(Some(&Data::String("  hello ".to_string()))),
            "hello"
        );
        assert_eq!(XlsxExtractor::format_cell_value(Some(&Data::Int(42))), "42");
        assert_eq!(
            XlsxExtractor::format_cell_value(Some(&Data::Float(2.5))),
            "2.5"
        );
        assert_eq!(
            XlsxExtractor::format_cell_value(Some(&Data::Float(30.0))),
            "30"
        );
        assert_eq!(
            XlsxExtractor::format_cell_value(Some(&Data::Bool(true))),
            "True"
        );
        assert_eq!(
            XlsxExtractor::format_cell_value(Some(&Data::Bool(false))),
            "False"
        );
        assert_eq!(
            XlsxExtractor::format_cell_value(Some(&Data::Error(CellErrorType::Div0))),
            "#DIV/0!"
        );
        assert_eq!(XlsxExtractor::format_cell_value(Some(&Data::Empty)), "");
        assert_eq!(XlsxExtractor::format_cell_value(None), "");
    }

    #[test]
    fn test_excel_serial_to_iso() {
        assert_eq!(
            XlsxExtractor::excel_serial_to_iso(45292.0).as_deref(),
            Some("2024-01-01")
        );
        assert_eq!(
            XlsxExtractor::excel_serial_to_iso(45292.5).as_deref(),
            Some("2024-01-01 12:00:00")
        );
    }

    #[test]
    fn test_sheet_rows_positions_and_empty_rows() {
        let mut range: Range<Data> = Range::new((0, 0), (2, 2));
        range.set_value((0, 0), Data::String("Name".into()));
        range.set_value((0, 2), Data::String("Age".into()));
        range.set_value((2, 0), Data::String("Bob".into()));
        range.set_value((2, 2), Data::Float(41.0));

        assert_eq!(
            XlsxExtractor::sheet_rows(&range, false),
            vec!["Name\t\tAge", "Bob\t\t41"]
        );
        assert_eq!(
            XlsxExtractor::sheet_rows(&range, true),
            vec!["Name\t\tAge", "\t\t", "Bob\t\t41"]
        );
    }

    #[test]
    fn test_empty_range_has_no_rows() {
        let range: Range<Data> = Range::empty();
        assert!(XlsxExtractor::sheet_rows(&range, true).is_empty());
    }

    #[test]
    fn test_invalid_workbook_is_open_error() {
        let result = XlsxExtractor::extract(b"not a workbook", false);
        assert!(matches!(result, Err(DoctextError::Open(_))));
    }
}
