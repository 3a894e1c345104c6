//! BTG Pactual: spreadsheet export and PDF statement.
//!
//! Spreadsheet columns: `Data e hora | Categoria | Transação | Descrição | Valor`.
//! The PDF goes through the shared line engine.

use std::path::Path;

use crate::banks::common::{data_rows, has_extension, line_has_all, locate_header, name_hint, require, sink_for};
use crate::banks::BankParser;
use crate::error::Result;
use crate::formats::table::{cell, cell_text, Table};
use crate::formats::{excel, pdf};
use crate::models::{AccountKind, FileType, ParseOptions, ParseResult};
use crate::normalize::{clean_description, is_noise_row};
use crate::rows::RawRow;

const BANK: &str = "BTG Pactual";

pub struct BtgExcel;

impl BtgExcel {
    pub fn parse_table(&self, table: &Table, options: &ParseOptions) -> Result<ParseResult> {
        let (header, cols) = locate_header(table, &["data", "valor"], BANK)?;
        let date = require(&cols, &["data e hora", "data"], BANK)?;
        let value = require(&cols, &["valor"], BANK)?;
        let kind = cols.find(&["transacao"]);
        let details = cols.find(&["descricao"]);

        let mut sink = sink_for(self, options);
        for (line, row) in data_rows(table, header) {
            let parts: Vec<String> = [kind, details]
                .into_iter()
                .flatten()
                .map(|i| clean_description(&cell_text(row, i)))
                .filter(|s| !s.is_empty())
                .collect();
            let description = parts.join(" - ");
            if is_noise_row(&description) || is_noise_row(&cell_text(row, date)) {
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

impl BankParser for BtgExcel {
    fn key(&self) -> &'static str {
        "btg-excel"
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
            && (name_hint(file_name, "btg") || line_has_all(first_lines, &["data e hora", "transacao"]))
    }

    fn parse_file(&self, path: &Path, options: &ParseOptions) -> Result<ParseResult> {
        self.parse_table(&excel::read_first_sheet(path)?, options)
    }
}

pub struct BtgPdf;

impl BtgPdf {
    pub fn parse_text(&self, text: &str, options: &ParseOptions) -> ParseResult {
        let mut sink = sink_for(self, options);
        pdf::parse_text(text, &mut sink);
        sink.finish()
    }
}

impl BankParser for BtgPdf {
    fn key(&self) -> &'static str {
        "btg-pdf"
    }

    fn bank_name(&self) -> &'static str {
        BANK
    }

    fn account_type(&self) -> AccountKind {
        AccountKind::Checking
    }

    fn file_types(&self) -> &'static [FileType] {
        &[FileType::Pdf]
    }

    fn can_parse(&self, file_name: &str, first_lines: &[String]) -> bool {
        has_extension(file_name, &["pdf"]) && line_has_all(first_lines, &["btg pactual"])
    }

    fn parse_file(&self, path: &Path, options: &ParseOptions) -> Result<ParseResult> {
        Ok(self.parse_text(&pdf::extract_text(path)?, options))
    }
}
