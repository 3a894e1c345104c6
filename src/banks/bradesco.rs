//! Bradesco checking account CSV (`;`, Latin-1).
//!
//! ```text
//! Extrato de: Agência: 1234 Conta: 56789-0 Movimentação entre: 01/01/2024 e 31/01/2024
//! Data;Histórico;Docto.;Crédito (R$);Débito (R$);Saldo (R$)
//! 02/01/2024;SALDO ANTERIOR;;;;1.000,00
//! 03/01/2024;TRANSFERENCIA PIX;1234567;;150,00;850,00
//! ;REM: FULANO DE TAL 03/01;;;;
//! Total;;;0,00;150,00;
//! Últimos Lançamentos
//! ```
//!
//! Continuation rows (no date, no values) extend the previous description.

use std::path::Path;

use crate::banks::common::{data_rows, line_has_all, locate_header, name_hint, require, sink_for};
use crate::banks::BankParser;
use crate::error::Result;
use crate::formats::delimited;
use crate::formats::table::{cell, cell_text, credit_debit_amount, Table};
use crate::models::{AccountKind, FileType, ParseOptions, ParseResult};
use crate::normalize::{clean_description, fold, is_noise_row};
use crate::rows::RawRow;

const BANK: &str = "Bradesco";

pub struct Bradesco;

fn is_trailer(text: &str) -> bool {
    let folded = fold(text);
    folded.starts_with("ultimos lancamentos")
        || folded.starts_with("lancamentos futuros")
        || folded.starts_with("saldos invest")
}

impl Bradesco {
    pub fn parse_table(&self, table: &Table, options: &ParseOptions) -> Result<ParseResult> {
        let (header, cols) = locate_header(table, &["historico", "credito", "debito"], BANK)?;
        let date = require(&cols, &["data"], BANK)?;
        let history = require(&cols, &["historico"], BANK)?;
        let credit = require(&cols, &["credito"], BANK)?;
        let debit = require(&cols, &["debito"], BANK)?;

        let mut sink = sink_for(self, options);
        // Continuations only attach to the row directly above them.
        let mut last_accepted_line = None;

        for (line, row) in data_rows(table, header) {
            let raw_date = cell_text(row, date);
            let description = clean_description(&cell_text(row, history));
            if is_trailer(&raw_date) || is_trailer(&description) {
                break;
            }
            if is_noise_row(&raw_date) || is_noise_row(&description) {
                continue;
            }

            let no_values = cell(row, credit).is_empty() && cell(row, debit).is_empty();
            if raw_date.is_empty() && no_values {
                if last_accepted_line.map_or(false, |l| l + 1 == line) {
                    if let Some(previous) = sink.last_mut() {
                        previous.description = format!("{} {}", previous.description, description);
                        last_accepted_line = Some(line);
                    }
                }
                continue;
            }

            let accepted = sink.push(RawRow {
                line,
                date: cell(row, date).as_date(),
                raw_date,
                description,
                amount: credit_debit_amount(row, credit, debit),
                raw_amount: format!("{}|{}", cell_text(row, credit), cell_text(row, debit)),
                original: cols.original(row),
            });
            last_accepted_line = accepted.then_some(line);
        }
        Ok(sink.finish())
    }
}

impl BankParser for Bradesco {
    fn key(&self) -> &'static str {
        "bradesco"
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
        line_has_all(first_lines, &["historico", "credito", "debito"])
            && (name_hint(file_name, "bradesco") || line_has_all(first_lines, &["docto"]))
    }

    fn parse_file(&self, path: &Path, options: &ParseOptions) -> Result<ParseResult> {
        self.parse_table(&delimited::read_table(path)?, options)
    }
}
