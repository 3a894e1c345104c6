//! The parse pipeline: bank dialect first, then the generic parsers for the
//! container type, in a fixed order.

use std::fmt;
use std::path::Path;

use tracing::{info, warn};

use crate::banks::{BankParser, BankParserRegistry};
use crate::error::{ExtratoError, Result};
use crate::formats::{delimited, excel, pdf};
use crate::models::{FileType, ParseOptions, ParseResult};

/// One step of the fallback chain.
#[derive(Clone, Copy)]
pub enum Strategy<'r> {
    Dialect(&'r dyn BankParser),
    GenericCsv,
    BasicCsv,
    GenericExcel,
    GenericPdf,
}

impl fmt::Display for Strategy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Dialect(p) => write!(f, "{}", p.key()),
            Strategy::GenericCsv => f.write_str("generic-csv"),
            Strategy::BasicCsv => f.write_str("basic-csv"),
            Strategy::GenericExcel => f.write_str("generic-excel"),
            Strategy::GenericPdf => f.write_str("generic-pdf"),
        }
    }
}

impl Strategy<'_> {
    pub fn run(&self, path: &Path, options: &ParseOptions) -> Result<ParseResult> {
        match self {
            Strategy::Dialect(p) => p.parse_file(path, options),
            Strategy::GenericCsv => delimited::parse_generic(path, options),
            Strategy::BasicCsv => delimited::parse_basic(path, options),
            Strategy::GenericExcel => excel::parse_generic(path, options),
            Strategy::GenericPdf => pdf::parse_generic(path, options),
        }
    }
}

/// Fallback chain for a file: the dialect (if any), then the generic
/// parsers for its container type.
pub fn strategies<'r>(file_type: FileType, dialect: Option<&'r dyn BankParser>) -> Vec<Strategy<'r>> {
    let mut chain: Vec<Strategy<'r>> = dialect.into_iter().map(Strategy::Dialect).collect();
    match file_type {
        FileType::Csv => chain.extend([Strategy::GenericCsv, Strategy::BasicCsv]),
        FileType::Excel => chain.push(Strategy::GenericExcel),
        FileType::Pdf => chain.push(Strategy::GenericPdf),
    }
    chain
}

/// Parse a statement without persisting anything.
///
/// `file_name` is the user-facing name (it drives extension and dialect
/// hints). `forced_key` skips detection and uses that dialect first.
pub fn parse_statement(
    registry: &BankParserRegistry,
    path: &Path,
    file_name: &str,
    options: &ParseOptions,
    forced_key: Option<&str>,
) -> Result<ParseResult> {
    let file_type = FileType::from_file_name(file_name)
        .ok_or_else(|| ExtratoError::UnsupportedFile(file_name.to_string()))?;

    let dialect = match forced_key {
        Some(key) => Some(
            registry
                .parser_by_key(key)
                .ok_or_else(|| ExtratoError::Other(format!("Unknown format: {key}")))?,
        ),
        None => registry.detect_parser(path, Some(file_name)),
    };

    let mut best: Option<ParseResult> = None;
    let mut failures = Vec::new();

    for strategy in strategies(file_type, dialect) {
        match strategy.run(path, options) {
            Ok(result) if !result.transactions.is_empty() => {
                info!(
                    file = %file_name,
                    strategy = %strategy,
                    transactions = result.transactions.len(),
                    errors = result.errors.len(),
                    "parsed statement"
                );
                return Ok(result);
            }
            Ok(result) => {
                warn!(file = %file_name, strategy = %strategy, "no transactions, trying next parser");
                if best.is_none() {
                    best = Some(result);
                }
            }
            Err(e) => {
                warn!(file = %file_name, strategy = %strategy, error = %e, "parser failed, trying next");
                failures.push(format!("{strategy}: {e}"));
            }
        }
    }

    best.ok_or_else(|| ExtratoError::ParseFailed(failures.join("; ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn options() -> ParseOptions {
        ParseOptions::default().with_today(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
    }

    #[test]
    fn test_strategy_chains() {
        let registry = BankParserRegistry::default_order();
        let nubank = registry.parser_by_key("nubank-card");
        let names: Vec<String> = strategies(FileType::Csv, nubank).iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["nubank-card", "generic-csv", "basic-csv"]);
        let names: Vec<String> = strategies(FileType::Pdf, None).iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["generic-pdf"]);
    }

    #[test]
    fn test_dialect_used_when_recognized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload");
        std::fs::write(&path, "date,title,amount\n2024-01-10,Uber *Trip,23.45\n").unwrap();
        let registry = BankParserRegistry::default_order();
        let result = parse_statement(&registry, &path, "Nubank_2024.csv", &options(), None).unwrap();
        assert_eq!(result.bank_name.as_deref(), Some("Nubank"));
    }

    #[test]
    fn test_falls_back_to_generic_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banco.csv");
        std::fs::write(&path, "Data;Histórico;Valor\n02/01/2024;PIX;-10,00\n").unwrap();
        let registry = BankParserRegistry::default_order();
        let result = parse_statement(&registry, &path, "banco.csv", &options(), None).unwrap();
        assert!(result.bank_name.is_none());
        assert_eq!(result.transactions.len(), 1);
    }

    #[test]
    fn test_forced_dialect_falls_through_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banco.csv");
        std::fs::write(&path, "Data;Descrição;Valor\n02/01/2024;PIX;-10,00\n").unwrap();
        let registry = BankParserRegistry::default_order();
        // Nubank card cannot find its header, so the generic parser takes over.
        let result = parse_statement(&registry, &path, "banco.csv", &options(), Some("nubank-card")).unwrap();
        assert_eq!(result.transactions.len(), 1);
        assert!(parse_statement(&registry, &path, "banco.csv", &options(), Some("nope")).is_err());
    }

    #[test]
    fn test_zero_transactions_returns_best_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vazio.csv");
        std::fs::write(&path, "Data;Descrição;Valor\n02/01/2030;FUTURO;-10,00\n").unwrap();
        let registry = BankParserRegistry::default_order();
        let result = parse_statement(&registry, &path, "vazio.csv", &options(), None).unwrap();
        assert!(result.transactions.is_empty());
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_headerless_csv_yields_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.csv");
        std::fs::write(&path, "a,b\n").unwrap();
        let registry = BankParserRegistry::default_order();
        // Basic CSV reads a header and no rows: an empty result, not an error.
        let result = parse_statement(&registry, &path, "x.csv", &options(), None).unwrap();
        assert!(result.transactions.is_empty());
    }

    #[test]
    fn test_all_failures_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a workbook").unwrap();
        let registry = BankParserRegistry::default_order();
        assert!(matches!(
            parse_statement(&registry, &path, "broken.xlsx", &options(), None),
            Err(ExtratoError::ParseFailed(_))
        ));
        assert!(matches!(
            parse_statement(&registry, &path, "x.doc", &options(), None),
            Err(ExtratoError::UnsupportedFile(_))
        ));
    }
}
