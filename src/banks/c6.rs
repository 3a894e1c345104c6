//! C6 Bank credit card invoice CSV.
//!
//! ```text
//! Data de Compra;Nome no Cartão;Final do Cartão;Categoria;Descrição;Parcela;Valor (em US$);Cotação (em R$);Valor (em R$)
//! 05/01/2024;FULANO T;1234;Restaurante;IFOOD *RESTAURANTE;Única;0;0;58,90
//! ```

use std::path::Path;

use crate::banks::common::{card_amount, data_rows, has_extension, line_has_all, locate_header, require, sink_for};
use crate::banks::BankParser;
use crate::error::Result;
use crate::formats::delimited;
use crate::formats::table::{cell, cell_text, Table};
use crate::models::{AccountKind, FileType, ParseOptions, ParseResult};
use crate::normalize::{clean_description, fold, is_noise_row};
use crate::rows::RawRow;

const BANK: &str = "C6 Bank";

pub struct C6Card;

impl C6Card {
    pub fn parse_table(&self, table: &Table, options: &ParseOptions) -> Result<ParseResult> {
        let (header, cols) = locate_header(table, &["data de compra", "nome no cartao"], BANK)?;
        let date = require(&cols, &["data de compra"], BANK)?;
        let description_col = require(&cols, &["descricao"], BANK)?;
        let value = require(&cols, &["valor (em r$)"], BANK)?;
        let installment = cols.find(&["parcela"]);

        let mut sink = sink_for(self, options);
        for (line, row) in data_rows(table, header) {
            let mut description = clean_description(&cell_text(row, description_col));
            if is_noise_row(&description) {
                continue;
            }
            if let Some(idx) = installment {
                let parcela = cell_text(row, idx);
                if !matches!(fold(&parcela).as_str(), "" | "unica" | "-") && !description.is_empty() {
                    description = format!("{description} - Parcela {parcela}");
                }
            }
            sink.push(RawRow {
                line,
                date: cell(row, date).as_date(),
                raw_date: cell_text(row, date),
                amount: cell(row, value).as_amount().map(|v| card_amount(v, &description)),
                raw_amount: cell_text(row, value),
                description,
                original: cols.original(row),
            });
        }
        Ok(sink.finish())
    }
}

impl BankParser for C6Card {
    fn key(&self) -> &'static str {
        "c6-card"
    }

    fn bank_name(&self) -> &'static str {
        BANK
    }

    fn account_type(&self) -> AccountKind {
        AccountKind::CreditCard
    }

    fn file_types(&self) -> &'static [FileType] {
        &[FileType::Csv]
    }

    fn can_parse(&self, file_name: &str, first_lines: &[String]) -> bool {
        has_extension(file_name, &["csv"]) && line_has_all(first_lines, &["data de compra", "nome no cartao"])
    }

    fn parse_file(&self, path: &Path, options: &ParseOptions) -> Result<ParseResult> {
        self.parse_table(&delimited::read_table(path)?, options)
    }
}
