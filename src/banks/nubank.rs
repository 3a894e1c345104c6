//! Nubank CSV exports.
//!
//! Card statement (`Nubank_2024-01-15.csv`):
//!
//! ```text
//! date,title,amount
//! 2024-01-10,Uber *Trip,23.45
//! 2024-01-12,Pagamento recebido,-1500.00
//! ```
//!
//! Account statement (`NU_12345_01JAN2024_31JAN2024.csv`):
//!
//! ```text
//! Data,Valor,Identificador,Descrição
//! 02/01/2024,-50.00,65a1f...,Transferência enviada pelo Pix - FULANO
//! ```

use std::path::Path;

use crate::banks::common::{card_amount, data_rows, has_extension, line_has_all, locate_header, require, sink_for};
use crate::banks::BankParser;
use crate::error::Result;
use crate::formats::delimited;
use crate::formats::table::{cell, cell_text, Table};
use crate::models::{AccountKind, FileType, ParseOptions, ParseResult};
use crate::normalize::{clean_description, is_noise_row};
use crate::rows::RawRow;

const BANK: &str = "Nubank";

pub struct NubankCard;

impl NubankCard {
    pub fn parse_table(&self, table: &Table, options: &ParseOptions) -> Result<ParseResult> {
        let (header, cols) = locate_header(table, &["date", "title", "amount"], BANK)?;
        let date = require(&cols, &["date"], BANK)?;
        let title = require(&cols, &["title"], BANK)?;
        let amount = require(&cols, &["amount"], BANK)?;

        let mut sink = sink_for(self, options);
        for (line, row) in data_rows(table, header) {
            let description = clean_description(&cell_text(row, title));
            if is_noise_row(&description) {
                continue;
            }
            sink.push(RawRow {
                line,
                date: cell(row, date).as_date(),
                raw_date: cell_text(row, date),
                amount: cell(row, amount).as_amount().map(|v| card_amount(v, &description)),
                raw_amount: cell_text(row, amount),
                description,
                original: cols.original(row),
            });
        }
        Ok(sink.finish())
    }
}

impl BankParser for NubankCard {
    fn key(&self) -> &'static str {
        "nubank-card"
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
        has_extension(file_name, &["csv"]) && line_has_all(first_lines, &["date", "title", "amount"])
    }

    fn parse_file(&self, path: &Path, options: &ParseOptions) -> Result<ParseResult> {
        self.parse_table(&delimited::read_table(path)?, options)
    }
}

pub struct NubankAccount;

impl NubankAccount {
    pub fn parse_table(&self, table: &Table, options: &ParseOptions) -> Result<ParseResult> {
        let (header, cols) =
            locate_header(table, &["data", "valor", "identificador", "descricao"], BANK)?;
        let date = require(&cols, &["data"], BANK)?;
        let value = require(&cols, &["valor"], BANK)?;
        let description_col = require(&cols, &["descricao"], BANK)?;

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

impl BankParser for NubankAccount {
    fn key(&self) -> &'static str {
        "nubank-account"
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
        has_extension(file_name, &["csv"])
            && line_has_all(first_lines, &["data", "valor", "identificador", "descricao"])
    }

    fn parse_file(&self, path: &Path, options: &ParseOptions) -> Result<ParseResult> {
        self.parse_table(&delimited::read_table(path)?, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::banks::common::testing::{csv_table, lines, options};
    use crate::models::TransactionType;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    const CARD: &str = "\
date,title,amount
2024-01-10,Uber *Trip,23.45
2024-01-12,Pagamento recebido,1500.00
2024-01-13,Estorno Loja,-30.00
2025-06-01,Compra futura,10.00
";

    const ACCOUNT: &str = "\
Data,Valor,Identificador,Descrição
02/01/2024,-50.00,65a1f0aa,Transferência enviada pelo Pix - FULANO
03/01/2024,3000.00,65a1f0ab,Transferência recebida - EMPRESA LTDA
";

    #[test]
    fn test_card_signs() {
        let result = NubankCard.parse_table(&csv_table(CARD), &options()).unwrap();
        assert_eq!(result.bank_name.as_deref(), Some("Nubank"));
        assert_eq!(result.account_type, Some(AccountKind::CreditCard));
        assert_eq!(result.transactions.len(), 3);
        assert_eq!(result.transactions[0].kind, TransactionType::Expense);
        assert_eq!(result.transactions[0].amount, Decimal::from_str("23.45").unwrap());
        assert_eq!(result.transactions[1].kind, TransactionType::Income);
        assert_eq!(result.transactions[2].kind, TransactionType::Income);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("in the future"));
    }

    #[test]
    fn test_account_rows() {
        let result = NubankAccount.parse_table(&csv_table(ACCOUNT), &options()).unwrap();
        assert_eq!(result.transactions.len(), 2);
        let first = &result.transactions[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(first.kind, TransactionType::Expense);
        assert_eq!(first.original_data["Identificador"], serde_json::Value::String("65a1f0aa".into()));
        assert_eq!(result.transactions[1].kind, TransactionType::Income);
    }

    #[test]
    fn test_recognizers_do_not_overlap() {
        assert!(NubankCard.can_parse("Nubank_2024-01-15.csv", &lines(CARD)));
        assert!(!NubankAccount.can_parse("Nubank_2024-01-15.csv", &lines(CARD)));
        assert!(NubankAccount.can_parse("NU_123.csv", &lines(ACCOUNT)));
        assert!(!NubankCard.can_parse("NU_123.csv", &lines(ACCOUNT)));
        assert!(!NubankCard.can_parse("fatura.pdf", &lines(CARD)));
    }
}
