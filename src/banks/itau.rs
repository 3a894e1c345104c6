//! Itaú: spreadsheet statement and the headerless `.txt` export.
//!
//! Spreadsheet, after a preamble:
//!
//! ```text
//! data       | lançamento          | ag./origem | valor (R$) | saldos (R$)
//! 02/01/2024 | SALDO ANTERIOR      |            |            | 1.000,00
//! 03/01/2024 | PIX TRANSF FULANO   | 1234       | -50,00     |
//! lançamentos futuros
//! ```
//!
//! TXT, one transaction per line:
//!
//! ```text
//! 03/01/2024;PIX TRANSF FULANO;-50,00
//! ```

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::banks::common::{data_rows, has_extension, line_has_all, locate_header, name_hint, require, sink_for};
use crate::banks::BankParser;
use crate::error::Result;
use crate::formats::delimited::parse_delimited;
use crate::formats::table::{cell, cell_text, positional_original, row_is_blank, Table};
use crate::formats::{excel, read_text};
use crate::models::{AccountKind, FileType, ParseOptions, ParseResult};
use crate::normalize::{clean_description, fold, is_noise_row};
use crate::rows::RawRow;

const BANK: &str = "Itaú";

static TXT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4};[^;]*;\s*-?[\d.]+,\d{2}\s*$").unwrap());

pub struct ItauExcel;

fn row_mentions(row: &[crate::formats::table::Cell], needle: &str) -> bool {
    row.iter().any(|c| fold(&c.text()).contains(needle))
}

impl ItauExcel {
    pub fn parse_table(&self, table: &Table, options: &ParseOptions) -> Result<ParseResult> {
        let (header, cols) = locate_header(table, &["lancamento", "valor"], BANK)?;
        let date = require(&cols, &["data"], BANK)?;
        let description_col = require(&cols, &["lancamento", "historico"], BANK)?;
        let value = require(&cols, &["valor (r$)", "valor"], BANK)?;

        let mut sink = sink_for(self, options);
        for (line, row) in data_rows(table, header) {
            if row_mentions(row, "lancamentos futuros") {
                break;
            }
            let description = clean_description(&cell_text(row, description_col));
            if is_noise_row(&description) {
                continue;
            }
            sink.push(RawRow {
                line,
                date: cell(row, date).as_date(),
                raw_date: cell_text(row, date),
                description,
                amount: cell(row, value).as_amount(),
                raw_amount: cell_text(row, value),
                original: cols.original(row),
            });
        }
        Ok(sink.finish())
    }
}

impl BankParser for ItauExcel {
    fn key(&self) -> &'static str {
        "itau-excel"
    }

    fn bank_name(&self) -> &'static str {
        BANK
    }

    fn account_type(&self) -> AccountKind {
        AccountKind::Checking
    }

    fn file_types(&self) -> &'static [FileType] {
        &[FileType::Excel]
    }

    fn can_parse(&self, file_name: &str, first_lines: &[String]) -> bool {
        has_extension(file_name, &["xls", "xlsx"])
            && line_has_all(first_lines, &["lancamento", "valor (r$)"])
            && (name_hint(file_name, "itau") || line_has_all(first_lines, &["ag./origem"]))
    }

    fn parse_file(&self, path: &Path, options: &ParseOptions) -> Result<ParseResult> {
        self.parse_table(&excel::read_first_sheet(path)?, options)
    }
}

pub struct ItauTxt;

impl ItauTxt {
    pub fn parse_text(&self, text: &str, options: &ParseOptions) -> ParseResult {
        let table = parse_delimited(text, b';');
        let mut sink = sink_for(self, options);
        for (idx, row) in table.rows.iter().enumerate() {
            if row_is_blank(row) {
                continue;
            }
            let description = clean_description(&cell_text(row, 1));
            if is_noise_row(&description) {
                continue;
            }
            sink.push(RawRow {
                line: idx + 1,
                date: cell(row, 0).as_date(),
                raw_date: cell_text(row, 0),
                description,
                amount: cell(row, 2).as_amount(),
                raw_amount: cell_text(row, 2),
                original: positional_original(row),
            });
        }
        sink.finish()
    }
}

impl BankParser for ItauTxt {
    fn key(&self) -> &'static str {
        "itau-txt"
    }

    fn bank_name(&self) -> &'static str {
        BANK
    }

    fn account_type(&self) -> AccountKind {
        AccountKind::Checking
    }

    fn file_types(&self) -> &'static [FileType] {
        &[FileType::Csv]
    }

    fn can_parse(&self, file_name: &str, first_lines: &[String]) -> bool {
        has_extension(file_name, &["txt"])
            && first_lines.first().map_or(false, |l| TXT_LINE.is_match(l.trim()))
    }

    fn parse_file(&self, path: &Path, options: &ParseOptions) -> Result<ParseResult> {
        Ok(self.parse_text(&read_text(path)?, options))
    }
}
