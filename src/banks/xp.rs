//! XP Investimentos: credit card invoice and checking account exports.
//!
//! Card (`Fatura2024-01-10.csv`):
//!
//! ```text
//! Data;Estabelecimento;Portador;Valor;Parcela
//! 02/01/2024;PADARIA REAL;FULANO TAL;R$ 45,90;-
//! 03/01/2024;LOJA ONLINE;FULANO TAL;R$ 300,00;1 de 3
//! ```
//!
//! Account (`extrato_xp.csv` or `.xlsx`):
//!
//! ```text
//! Data;Descrição;Valor;Saldo
//! 02/01/24 às 10:15:00;Pix enviado;-R$ 50,00;R$ 950,00
//! ```

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::banks::common::{
    card_amount, data_rows, has_extension, line_has_all, load_grid, locate_header, name_token, require,
    sink_for,
};
use crate::banks::BankParser;
use crate::error::Result;
use crate::formats::delimited;
use crate::formats::table::{cell, cell_text, Table};
use crate::models::{AccountKind, FileType, ParseOptions, ParseResult};
use crate::normalize::{clean_description, fold, is_noise_row};
use crate::rows::RawRow;

const BANK: &str = "XP";

static AS_TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{2}/\d{2}/\d{2,4} às \d{2}:\d{2}").unwrap());

/// Installment markers that carry no information.
fn is_single_installment(parcela: &str) -> bool {
    matches!(fold(parcela).as_str(), "" | "-" | "unica" | "a vista")
}

pub struct XpCard;

impl XpCard {
    pub fn parse_table(&self, table: &Table, options: &ParseOptions) -> Result<ParseResult> {
        let (header, cols) = locate_header(table, &["estabelecimento", "portador", "valor"], BANK)?;
        let date = require(&cols, &["data"], BANK)?;
        let merchant = require(&cols, &["estabelecimento"], BANK)?;
        let value = require(&cols, &["valor"], BANK)?;
        let installment = cols.find(&["parcela"]);

        let mut sink = sink_for(self, options);
        for (line, row) in data_rows(table, header) {
            let mut description = clean_description(&cell_text(row, merchant));
            if is_noise_row(&description) {
                continue;
            }
            if let Some(idx) = installment {
                let parcela = cell_text(row, idx);
                if !is_single_installment(&parcela) && !description.is_empty() {
                    description = format!("{description} ({parcela})");
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

impl BankParser for XpCard {
    fn key(&self) -> &'static str {
        "xp-card"
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
        has_extension(file_name, &["csv"])
            && line_has_all(first_lines, &["estabelecimento", "portador", "valor"])
    }

    fn parse_file(&self, path: &Path, options: &ParseOptions) -> Result<ParseResult> {
        self.parse_table(&delimited::read_table(path)?, options)
    }
}

pub struct XpAccount;

impl XpAccount {
    pub fn parse_table(&self, table: &Table, options: &ParseOptions) -> Result<ParseResult> {
        let (header, cols) = locate_header(table, &["data", "valor"], BANK)?;
        let date = require(&cols, &["data"], BANK)?;
        let description_col = require(&cols, &["descricao", "historico", "lancamento"], BANK)?;
        let value = require(&cols, &["valor"], BANK)?;

        let mut sink = sink_for(self, options);
        for (line, row) in data_rows(table, header) {
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

impl BankParser for XpAccount {
    fn key(&self) -> &'static str {
        "xp-account"
    }

    fn bank_name(&self) -> &'static str {
        BANK
    }

    fn account_type(&self) -> AccountKind {
        AccountKind::Checking
    }

    fn file_types(&self) -> &'static [FileType] {
        &[FileType::Csv, FileType::Excel]
    }

    fn can_parse(&self, file_name: &str, first_lines: &[String]) -> bool {
        if !has_extension(file_name, &["csv", "xls", "xlsx"]) {
            return false;
        }
        let by_name = name_token(file_name, "xp") && line_has_all(first_lines, &["data", "valor"]);
        let by_layout = line_has_all(first_lines, &["data", "descricao", "valor", "saldo"])
            && first_lines.iter().any(|l| AS_TIMESTAMP.is_match(l));
        by_name || by_layout
    }

    fn parse_file(&self, path: &Path, options: &ParseOptions) -> Result<ParseResult> {
        self.parse_table(&load_grid(path)?, options)
    }
}
