pub mod delimited;
pub mod excel;
pub mod pdf;
pub mod table;

use std::fs;
use std::path::Path;

use crate::encoding;
use crate::error::{ExtratoError, Result};
use crate::models::{FileType, ParseOptions, ParseResult};
use crate::normalize::{clean_description, fold, is_noise_row};
use crate::rows::{RawRow, RowSink};
use table::{cell, cell_text, row_is_blank, GenericLayout, Table};

/// Rows searched for a header before giving up.
pub const HEADER_SEARCH_ROWS: usize = 40;

/// Lines handed to dialect recognizers.
pub const PROBE_LINES: usize = 15;

/// Read a text file and decode it with the detected charset.
pub fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(encoding::decode(&bytes).0)
}

/// Load a CSV/TXT or spreadsheet into a grid.
pub fn read_grid(path: &Path, file_type: FileType) -> Result<Table> {
    match file_type {
        FileType::Csv => delimited::read_table(path),
        FileType::Excel => excel::read_first_sheet(path),
        FileType::Pdf => Err(ExtratoError::UnsupportedFile(format!(
            "{} is a PDF and has no cell grid",
            path.display()
        ))),
    }
}

/// First lines of a file as the recognizers see them: decoded text for
/// CSV/TXT, `;`-joined cells for spreadsheets, extracted text for PDF.
pub fn probe_lines(path: &Path, file_type: FileType, limit: usize) -> Result<Vec<String>> {
    let lines = match file_type {
        FileType::Csv => read_text(path)?
            .lines()
            .filter(|l| !l.trim().is_empty())
            .take(limit)
            .map(str::to_string)
            .collect(),
        FileType::Excel => excel::read_first_sheet(path)?.first_lines(limit),
        // Bank names sit in page headers, so PDFs get a deeper look.
        FileType::Pdf => pdf::extract_text(path)?
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .take(limit * 3)
            .map(str::to_string)
            .collect(),
    };
    Ok(lines)
}

/// Balance and total rows may carry their label in the date column.
fn is_skippable(row: &[table::Cell], layout: &GenericLayout, description: &str) -> bool {
    is_noise_row(description) || is_noise_row(&cell_text(row, layout.date))
}

/// Map a grid through an auto-detected header. Shared by the generic CSV and
/// Excel parsers.
pub fn parse_generic_table(table: &Table, options: &ParseOptions) -> Result<ParseResult> {
    let (layout, cols) = GenericLayout::detect(table, HEADER_SEARCH_ROWS).ok_or_else(|| {
        ExtratoError::ParseFailed("no header row with date and amount columns".into())
    })?;
    let mut sink = RowSink::generic(options);

    for (idx, row) in table.rows.iter().enumerate().skip(layout.header_row + 1) {
        if row_is_blank(row) {
            continue;
        }
        let description = clean_description(&cell_text(row, layout.description));
        if is_skippable(row, &layout, &description) {
            continue;
        }
        // A repeated header (multi-page exports) is not data.
        if fold(&cell_text(row, layout.date)) == fold(&cols_name(&cols, layout.date)) {
            continue;
        }
        let date_cell = cell(row, layout.date);
        sink.push(RawRow {
            line: idx + 1,
            date: date_cell.as_date(),
            raw_date: date_cell.text(),
            description,
            amount: layout.amount(row),
            raw_amount: layout.raw_amount(row),
            original: cols.original(row),
        });
    }
    Ok(sink.finish())
}

fn cols_name(cols: &table::Columns, idx: usize) -> String {
    cols.name(idx).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use table::Cell;

    fn text_row(cells: &[&str]) -> Vec<Cell> {
        cells
            .iter()
            .map(|s| if s.is_empty() { Cell::Empty } else { Cell::Text(s.to_string()) })
            .collect()
    }

    #[test]
    fn test_generic_table_skips_repeated_header_and_totals() {
        let table = Table {
            rows: vec![
                text_row(&["Data", "Descrição", "Valor"]),
                text_row(&["02/01/2024", "PADARIA", "-12,00"]),
                text_row(&["Data", "Descrição", "Valor"]),
                text_row(&["03/01/2024", "PIX RECEBIDO", "50,00"]),
                text_row(&["Total", "", "38,00"]),
            ],
        };
        let options = ParseOptions::default().with_today(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        let result = parse_generic_table(&table, &options).unwrap();
        assert_eq!(result.total_processed, 2);
        assert_eq!(result.transactions.len(), 2);
        assert_eq!(result.transactions[1].original_data["line"], serde_json::Value::from(4u64));
    }

    #[test]
    fn test_probe_lines_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.csv");
        std::fs::write(&path, "\n\na;b\n\nc;d\ne;f\n").unwrap();
        let lines = probe_lines(&path, FileType::Csv, 2).unwrap();
        assert_eq!(lines, vec!["a;b".to_string(), "c;d".to_string()]);
    }
}
