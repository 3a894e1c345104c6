//! Clear Corretora account statement (spreadsheet or CSV).
//!
//! ```text
//! Liquidação;Movimentação;Lançamento;Valor;Saldo
//! 03/01/2024;02/01/2024;TED RECEBIDA;1.000,00;1.000,00
//! 05/01/2024;03/01/2024;COMPRA PETR4;-350,00;650,00
//! ```

use std::path::Path;

use crate::banks::common::{
    data_rows, has_extension, line_has_all, load_grid, locate_header, require, sink_for,
};
use crate::banks::BankParser;
use crate::error::Result;
use crate::formats::table::{cell, cell_text, Table};
use crate::models::{AccountKind, FileType, ParseOptions, ParseResult};
use crate::normalize::{clean_description, is_noise_row};
use crate::rows::RawRow;

const BANK: &str = "Clear";

pub struct Clear;

impl Clear {
    pub fn parse_table(&self, table: &Table, options: &ParseOptions) -> Result<ParseResult> {
        let (header, cols) = locate_header(table, &["liquidacao", "movimentacao"], BANK)?;
        let settled = require(&cols, &["liquidacao"], BANK)?;
        let moved = require(&cols, &["movimentacao"], BANK)?;
        let description_col = require(&cols, &["lancamento", "historico", "descricao"], BANK)?;
        let value = require(&cols, &["valor"], BANK)?;

        let mut sink = sink_for(self, options);
        for (line, row) in data_rows(table, header) {
            let description = clean_description(&cell_text(row, description_col));
            if is_noise_row(&description) {
                continue;
            }
            // Movement date is when the money moved; settlement may lag days.
            let date_col = if cell(row, moved).is_empty() { settled } else { moved };
            sink.push(RawRow {
                line,
                date: cell(row, date_col).as_date(),
                raw_date: cell_text(row, date_col),
                description,
                amount: cell(row, value).as_amount(),
                raw_amount: cell_text(row, value),
                original: cols.original(row),
            });
        }
        Ok(sink.finish())
    }
}

impl BankParser for Clear {
    fn key(&self) -> &'static str {
        "clear"
    }

    fn bank_name(&self) -> &'static str {
        BANK
    }

    fn account_type(&self) -> AccountKind {
        AccountKind::Investment
    }

    fn file_types(&self) -> &'static [FileType] {
        &[FileType::Csv, FileType::Excel]
    }

    fn can_parse(&self, file_name: &str, first_lines: &[String]) -> bool {
        has_extension(file_name, &["csv", "xls", "xlsx"])
            && line_has_all(first_lines, &["liquidacao", "movimentacao"])
    }

    fn parse_file(&self, path: &Path, options: &ParseOptions) -> Result<ParseResult> {
        self.parse_table(&load_grid(path)?, options)
    }
}
