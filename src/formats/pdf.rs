//! PDF statements: text extraction plus a line engine that understands both
//! single-line entries and sectioned layouts.
//!
//! Inline layout, one transaction per line:
//!
//! ```text
//! 02/01/2024  PIX ENVIADO FULANO        -50,00    1.200,00
//! ```
//!
//! Sectioned layout, a date heading followed by description and value lines:
//!
//! ```text
//! 02/01/2024
//! Pix enviado
//! Fulano de Tal
//! -50,00
//! ```

use std::path::Path;

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{ExtratoError, Result};
use crate::models::{OriginalData, ParseOptions, ParseResult};
use crate::normalize::{clean_description, fold, is_noise_row, parse_amount, parse_date, parse_day_month};
use crate::rows::{RawRow, RowSink};

const AMOUNT: &str = r"(?:-\s*)?(?:R\$\s*)?-?\(?\d[\d.]*,\d{2}\)?(?:\s?[DC]|-)?";
const DATE: &str = r"\d{2}/\d{2}/\d{4}|\d{2}/\d{2}/\d{2}|\d{4}-\d{2}-\d{2}|\d{2}/\d{2}";

static INLINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(?P<date>{DATE})\s+(?P<desc>.+?)\s+(?P<amount>{AMOUNT})(?:\s+{AMOUNT})?$"
    ))
    .unwrap()
});
static DATE_ONLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^(?P<date>{DATE}|\d{{1,2}}\s+(?:de\s+)?[a-z]{{3}}[a-z]*\.?(?:\s+(?:de\s+)?\d{{4}})?)$")).unwrap()
});
static AMOUNT_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(&format!(r"^(?P<amount>{AMOUNT})$")).unwrap());
static DESC_AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^(?P<desc>.*?[^\d\s.,].*?)\s+(?P<amount>{AMOUNT})(?:\s+{AMOUNT})?$")).unwrap()
});
static FULL_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{2}/\d{2}/(\d{4})\b").unwrap());
static PAGE_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:pagina|pag\.?|page|folha)\s*\d+(?:\s*(?:de|/|of)\s*\d+)?|\d+\s*/\s*\d+|\d+)$").unwrap()
});
static COLUMN_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^data\b.*\b(?:descricao|historico|lancamento|valor|saldo)\b").unwrap()
});

/// Descriptions longer than this many lines are treated as page furniture.
const MAX_PENDING_LINES: usize = 4;

#[cfg(feature = "pdf")]
pub fn extract_text_from_bytes(bytes: &[u8]) -> Result<String> {
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(ExtratoError::Pdf(e.to_string())),
        Err(_) => Err(ExtratoError::Pdf("text extraction panicked on a malformed PDF".into())),
    }
}

#[cfg(not(feature = "pdf"))]
pub fn extract_text_from_bytes(_bytes: &[u8]) -> Result<String> {
    Err(ExtratoError::UnsupportedFile("built without PDF support".into()))
}

pub fn extract_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    extract_text_from_bytes(&bytes)
}

/// Year used for "DD/MM" dates: the first full date printed on the statement,
/// else the current year.
pub fn statement_year(text: &str, options: &ParseOptions) -> i32 {
    FULL_DATE
        .captures(text)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or_else(|| options.today.year())
}

fn is_noise_line(folded: &str) -> bool {
    PAGE_NUMBER.is_match(folded) || COLUMN_HEADER.is_match(folded) || is_noise_row(folded)
}

fn resolve_date(raw: &str, year: i32) -> Option<NaiveDate> {
    parse_date(raw).or_else(|| parse_day_month(raw, year))
}

fn original(raw_line: &str) -> OriginalData {
    let mut map = OriginalData::new();
    map.insert("raw".to_string(), Value::String(raw_line.to_string()));
    map
}

#[derive(Default)]
struct Section {
    date: Option<(NaiveDate, String)>,
    pending: Vec<String>,
    first_line: usize,
}

impl Section {
    fn start(&mut self, date: NaiveDate, raw: &str) {
        self.date = Some((date, raw.to_string()));
        self.pending.clear();
    }

    fn add(&mut self, line_no: usize, text: &str) {
        if self.pending.is_empty() {
            self.first_line = line_no;
        }
        if self.pending.len() >= MAX_PENDING_LINES {
            self.pending.remove(0);
        }
        self.pending.push(text.to_string());
    }

    fn take_description(&mut self, tail: Option<&str>) -> String {
        let mut parts = std::mem::take(&mut self.pending);
        if let Some(t) = tail {
            parts.push(t.to_string());
        }
        clean_description(&parts.join(" "))
    }
}

/// Run the line engine over extracted text, feeding rows into `sink`.
pub fn parse_text(text: &str, sink: &mut RowSink<'_>) {
    let year = statement_year(text, sink.options());
    let mut section = Section::default();

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        let folded = fold(line);
        if is_noise_line(&folded) {
            section.pending.clear();
            continue;
        }

        if let Some(caps) = INLINE.captures(line) {
            let description = clean_description(&caps["desc"]);
            if is_noise_row(&description) {
                continue;
            }
            section.pending.clear();
            sink.push(RawRow {
                line: line_no,
                date: resolve_date(&caps["date"], year),
                raw_date: caps["date"].to_string(),
                description,
                amount: parse_amount(&caps["amount"]),
                raw_amount: caps["amount"].to_string(),
                original: original(line),
            });
            continue;
        }

        if let Some(caps) = DATE_ONLY.captures(&folded) {
            if let Some(date) = resolve_date(&caps["date"], year) {
                section.start(date, line);
                continue;
            }
        }

        let Some((date, raw_date)) = section.date.clone() else {
            continue;
        };

        if let Some(caps) = AMOUNT_ONLY.captures(line) {
            if section.pending.is_empty() {
                // A bare value with no description is a running balance.
                continue;
            }
            let first_line = section.first_line;
            let description = section.take_description(None);
            sink.push(RawRow {
                line: first_line,
                date: Some(date),
                raw_date,
                description,
                amount: parse_amount(&caps["amount"]),
                raw_amount: caps["amount"].to_string(),
                original: original(line),
            });
            continue;
        }

        if let Some(caps) = DESC_AMOUNT.captures(line) {
            let first_line = if section.pending.is_empty() { line_no } else { section.first_line };
            let description = section.take_description(Some(&caps["desc"]));
            if is_noise_row(&description) {
                continue;
            }
            sink.push(RawRow {
                line: first_line,
                date: Some(date),
                raw_date,
                description,
                amount: parse_amount(&caps["amount"]),
                raw_amount: caps["amount"].to_string(),
                original: original(line),
            });
            continue;
        }

        section.add(line_no, line);
    }
}

/// Generic PDF parser: regex line matching plus sectioned reconstruction.
pub fn parse_generic(path: &Path, options: &ParseOptions) -> Result<ParseResult> {
    let text = extract_text(path)?;
    let mut sink = RowSink::generic(options);
    parse_text(&text, &mut sink);
    Ok(sink.finish())
}
