//! XLS/XLSX statements. Only the first worksheet is read.

use std::path::Path;

use crate::error::Result;
#[cfg(not(feature = "excel"))]
use crate::error::ExtratoError;
use crate::formats::parse_generic_table;
use crate::formats::table::Table;
use crate::models::{ParseOptions, ParseResult};

#[cfg(feature = "excel")]
use crate::formats::table::{Cell, Row};

#[cfg(feature = "excel")]
fn to_cell(value: &calamine::Data) -> Cell {
    use crate::normalize::{excel_serial_to_date, parse_date};
    use calamine::Data;

    match value {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()).map_or(Cell::Empty, Cell::Date),
        Data::DateTimeIso(s) => parse_date(s).map_or_else(|| Cell::Text(s.clone()), Cell::Date),
        Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

/// Read the first worksheet into a grid. Row `i` is spreadsheet row `i + 1`
/// even when the used range starts further down.
#[cfg(feature = "excel")]
pub fn read_first_sheet(path: &Path) -> Result<Table> {
    use crate::error::ExtratoError;
    use calamine::{open_workbook_auto, Reader};

    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ExtratoError::ParseFailed(format!("{} has no worksheets", path.display())))??;

    let (first_row, first_col) = range.start().unwrap_or((0, 0));
    let mut rows: Vec<Row> = (0..first_row).map(|_| Vec::new()).collect();
    for data_row in range.rows() {
        let mut row: Row = (0..first_col).map(|_| Cell::Empty).collect();
        row.extend(data_row.iter().map(to_cell));
        rows.push(row);
    }
    tracing::debug!(path = %path.display(), rows = rows.len(), "read worksheet");
    Ok(Table { rows })
}

#[cfg(not(feature = "excel"))]
pub fn read_first_sheet(path: &Path) -> Result<Table> {
    Err(ExtratoError::UnsupportedFile(format!(
        "{}: built without Excel support",
        path.display()
    )))
}

/// Generic spreadsheet parser: header hunt over the first sheet.
pub fn parse_generic(path: &Path, options: &ParseOptions) -> Result<ParseResult> {
    let table = read_first_sheet(path)?;
    parse_generic_table(&table, options)
}

#[cfg(all(test, feature = "excel"))]
mod tests {
    use super::*;
    use calamine::Data;
    use chrono::NaiveDate;

    #[test]
    fn test_to_cell() {
        assert_eq!(to_cell(&Data::Empty), Cell::Empty);
        assert_eq!(to_cell(&Data::String("  ".into())), Cell::Empty);
        assert_eq!(to_cell(&Data::Int(3)), Cell::Number(3.0));
        assert_eq!(to_cell(&Data::Float(-45.9)), Cell::Number(-45.9));
        assert_eq!(
            to_cell(&Data::DateTimeIso("2024-03-01T10:00:00".into())),
            Cell::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );
        assert_eq!(to_cell(&Data::String("PIX".into())), Cell::Text("PIX".into()));
    }

    #[test]
    fn test_unreadable_workbook_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a zip file").unwrap();
        assert!(read_first_sheet(&path).is_err());
    }
}
