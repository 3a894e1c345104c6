//! CSV and TXT statements: delimiter detection, header hunting and the two
//! generic fallback parsers.

use std::path::Path;

use csv::ReaderBuilder;
use tracing::debug;

use crate::error::Result;
use crate::formats::table::{
    Cell, Table, AMOUNT_COLUMNS, CREDIT_COLUMNS, DATE_COLUMNS, DEBIT_COLUMNS, DESCRIPTION_COLUMNS,
};
use crate::formats::{parse_generic_table, read_text};
use crate::models::{OriginalData, ParseOptions, ParseResult};
use crate::normalize::{clean_description, fold, is_noise_row, parse_amount, parse_date};
use crate::rows::{RawRow, RowSink};

const CANDIDATES: [u8; 3] = [b';', b'\t', b','];
const SNIFF_LINES: usize = 10;

fn is_header_token(folded: &str, names: &[&str]) -> bool {
    names.iter().any(|n| folded == *n || folded.starts_with(n))
}

fn looks_like_amount(token: &str) -> bool {
    token.contains([',', '.']) && parse_amount(token).is_some()
}

/// A line qualifies if it has a date-like token and an amount- or
/// description-like token once split on `delimiter`.
fn line_qualifies(line: &str, delimiter: u8) -> bool {
    let tokens: Vec<&str> = line.split(delimiter as char).collect();
    if tokens.len() < 2 {
        return false;
    }
    let folded: Vec<String> = tokens.iter().map(|t| fold(t.trim().trim_matches('"'))).collect();
    let has_date = folded.iter().zip(&tokens).any(|(f, raw)| {
        is_header_token(f, DATE_COLUMNS) || parse_date(raw.trim().trim_matches('"')).is_some()
    });
    let has_value = folded.iter().zip(&tokens).any(|(f, raw)| {
        is_header_token(f, AMOUNT_COLUMNS)
            || is_header_token(f, DESCRIPTION_COLUMNS)
            || is_header_token(f, CREDIT_COLUMNS)
            || is_header_token(f, DEBIT_COLUMNS)
            || looks_like_amount(raw.trim().trim_matches('"'))
    });
    has_date && has_value
}

/// Pick `;`, tab or `,` for a delimited export.
pub fn detect_delimiter(text: &str) -> u8 {
    let lines: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();

    for line in &lines {
        for delim in CANDIDATES {
            if line_qualifies(line, delim) {
                return delim;
            }
        }
    }

    // No line looked like a transaction: take the most frequent candidate.
    CANDIDATES
        .iter()
        .copied()
        .max_by_key(|d| lines.iter().map(|l| l.matches(*d as char).count()).sum::<usize>())
        .filter(|d| lines.iter().any(|l| l.contains(*d as char)))
        .unwrap_or(b',')
}

/// Split delimited text into a table. Blank lines and unreadable records
/// become blank rows so that row `i` is always line `i + 1`.
pub fn parse_delimited(text: &str, delimiter: u8) -> Table {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());
    let mut records: Vec<Vec<String>> = Vec::new();
    for result in rdr.records() {
        match result {
            Ok(record) => {
                if let Some(pos) = record.position() {
                    while (records.len() as u64) + 1 < pos.line() {
                        records.push(Vec::new());
                    }
                }
                records.push(record.iter().map(str::to_string).collect());
            }
            Err(e) => {
                debug!(error = %e, "skipping unreadable CSV record");
                records.push(Vec::new());
            }
        }
    }
    Table::from_records(records)
}

/// Decode a delimited file and load it as a table.
pub fn read_table(path: &Path) -> Result<Table> {
    let text = read_text(path)?;
    let delimiter = detect_delimiter(&text);
    debug!(path = %path.display(), delimiter = %(delimiter as char).escape_default(), "detected delimiter");
    Ok(parse_delimited(&text, delimiter))
}

/// Advanced generic parser: delimiter detection, header hunt past preambles,
/// column synonyms and credit/debit pairs.
pub fn parse_generic(path: &Path, options: &ParseOptions) -> Result<ParseResult> {
    let table = read_table(path)?;
    parse_generic_table(&table, options)
}

/// Last-resort parser: comma separated, header on the first line, columns
/// date, description and amount by position.
pub fn parse_basic(path: &Path, options: &ParseOptions) -> Result<ParseResult> {
    let text = read_text(path)?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut sink = RowSink::generic(options);

    for (i, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                let line = e.position().map_or(i + 2, |p| p.line() as usize);
                sink.error(line, format!("unreadable record: {e}"));
                continue;
            }
        };
        let line = record.position().map_or(i + 2, |p| p.line() as usize);
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        if record.len() < 3 {
            sink.error(line, format!("expected 3 columns, found {}", record.len()));
            continue;
        }
        let description = clean_description(&record[1]);
        if is_noise_row(&description) {
            continue;
        }
        let mut original = OriginalData::new();
        for (col, value) in record.iter().enumerate() {
            original.insert(format!("col{col}"), Cell::Text(value.to_string()).to_json());
        }
        sink.push(RawRow {
            line,
            date: parse_date(&record[0]),
            raw_date: record[0].to_string(),
            description,
            amount: parse_amount(&record[2]),
            raw_amount: record[2].to_string(),
            original,
        });
    }
    Ok(sink.finish())
}
