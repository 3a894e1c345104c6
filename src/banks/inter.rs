//! Banco Inter checking account CSV.
//!
//! ```text
//! Extrato Conta Corrente
//! Conta ;12345678
//! Período ;01/01/2024 a 31/01/2024
//! Saldo ;1.000,00
//!
//! Data Lançamento;Histórico;Descrição;Valor;Saldo
//! 02/01/2024;Pix enviado ;Fulano de Tal;-50,00;950,00
//! ```

use std::path::Path;

use crate::banks::common::{data_rows, has_extension, line_has_all, locate_header, require, sink_for};
use crate::banks::BankParser;
use crate::error::Result;
use crate::formats::delimited;
use crate::formats::table::{cell, cell_text, Table};
use crate::models::{AccountKind, FileType, ParseOptions, ParseResult};
use crate::normalize::{clean_description, is_noise_row};
use crate::rows::RawRow;

const BANK: &str = "Inter";

pub struct Inter;

impl Inter {
    pub fn parse_table(&self, table: &Table, options: &ParseOptions) -> Result<ParseResult> {
        let (header, cols) = locate_header(table, &["data lancamento", "historico", "valor"], BANK)?;
        let date = require(&cols, &["data lancamento"], BANK)?;
        let history = require(&cols, &["historico"], BANK)?;
        let details = cols.find(&["descricao"]);
        let value = require(&cols, &["valor"], BANK)?;

        let mut sink = sink_for(self, options);
        for (line, row) in data_rows(table, header) {
            let history_text = clean_description(&cell_text(row, history));
            let details_text = details.map(|i| clean_description(&cell_text(row, i))).unwrap_or_default();
            let description = match (history_text.is_empty(), details_text.is_empty()) {
                (false, false) => format!("{history_text} - {details_text}"),
                (false, true) => history_text,
                _ => details_text,
            };
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

impl BankParser for Inter {
    fn key(&self) -> &'static str {
        "inter"
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
            && line_has_all(first_lines, &["data lancamento", "historico", "valor"])
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

    const STATEMENT: &str = "\
Extrato Conta Corrente
Conta ;12345678
Período ;01/01/2024 a 31/01/2024
Saldo ;1.000,00

Data Lançamento;Histórico;Descrição;Valor;Saldo
02/01/2024;Pix enviado ;Fulano de Tal;-50,00;950,00
03/01/2024;Pix recebido;Beltrano;120,00;1.070,00
04/01/2024;Pagamento efetuado;;0,00;1.070,00
";

    #[test]
    fn test_parse_statement() {
        let result = Inter.parse_table(&csv_table(STATEMENT), &options()).unwrap();
        assert_eq!(result.transactions.len(), 2);
        assert_eq!(result.transactions[0].description, "Pix enviado - Fulano de Tal");
        assert_eq!(result.transactions[0].kind, TransactionType::Expense);
        assert_eq!(result.transactions[1].kind, TransactionType::Income);
        assert_eq!(result.errors, vec!["Line 9: zero amount".to_string()]);
    }

    #[test]
    fn test_recognizer() {
        assert!(Inter.can_parse("Extrato-01-01-2024-a-31-01-2024.csv", &lines(STATEMENT)));
    }
}
