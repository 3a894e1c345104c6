//! Helpers shared by the dialect parsers.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use crate::banks::BankParser;
use crate::error::{ExtratoError, Result};
use crate::formats::table::{row_is_blank, Cell, Columns, Table};
use crate::formats::{read_grid, HEADER_SEARCH_ROWS};
use crate::models::{FileType, ParseOptions};
use crate::normalize::fold;
use crate::rows::RowSink;

static CARD_CREDIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"pagamento recebido|pagamento efetuado|pagamento de fatura|pagamento da fatura",
        r"|inclusao de pagamento|estorno|reembolso|cashback|devolucao|credito de",
    ))
    .unwrap()
});

/// Card statements list purchases as positive values. Negative values and
/// payment/refund lines are money coming back to the holder.
///
/// Returns a signed amount: positive is income, negative is expense.
pub fn card_amount(raw: Decimal, description: &str) -> Decimal {
    if raw.is_sign_negative() || CARD_CREDIT.is_match(&fold(description)) {
        raw.abs()
    } else {
        -raw.abs()
    }
}

pub fn has_extension(file_name: &str, extensions: &[&str]) -> bool {
    crate::models::extension(file_name).map_or(false, |ext| extensions.contains(&ext.as_str()))
}

/// Case- and accent-insensitive file name substring test.
pub fn name_hint(file_name: &str, needle: &str) -> bool {
    fold(file_name).contains(needle)
}

/// Like [`name_hint`], but `token` must stand alone between non-letters, so
/// "xp" matches `Extrato_XP.csv` and not `export.csv`.
pub fn name_token(file_name: &str, token: &str) -> bool {
    fold(file_name)
        .split(|c: char| !c.is_ascii_alphabetic())
        .any(|part| part == token)
}

/// True if any probed line contains every needle (folded).
pub fn line_has_all(first_lines: &[String], needles: &[&str]) -> bool {
    first_lines.iter().any(|line| {
        let folded = fold(line);
        needles.iter().all(|n| folded.contains(n))
    })
}

pub fn sink_for<'a, P: BankParser + ?Sized>(parser: &P, options: &'a ParseOptions) -> RowSink<'a> {
    RowSink::new(parser.bank_name(), parser.account_type(), options)
}

/// Header row whose folded cells contain all `needles`.
pub fn locate_header(table: &Table, needles: &[&str], bank: &str) -> Result<(usize, Columns)> {
    let idx = table
        .find_header(needles, HEADER_SEARCH_ROWS)
        .ok_or_else(|| ExtratoError::ParseFailed(format!("{bank}: header row not found")))?;
    Ok((idx, Columns::from_header(&table.rows[idx])))
}

pub fn require(cols: &Columns, synonyms: &[&str], bank: &str) -> Result<usize> {
    cols.find(synonyms).ok_or_else(|| {
        ExtratoError::ParseFailed(format!("{bank}: column \"{}\" not found", synonyms[0]))
    })
}

/// Non-blank rows after the header, paired with their 1-based line number.
pub fn data_rows(table: &Table, header: usize) -> impl Iterator<Item = (usize, &[Cell])> {
    table
        .rows
        .iter()
        .enumerate()
        .skip(header + 1)
        .filter(|(_, row)| !row_is_blank(row))
        .map(|(idx, row)| (idx + 1, row.as_slice()))
}

/// Load CSV/TXT or spreadsheet input, picked by extension.
pub fn load_grid(path: &Path) -> Result<Table> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let file_type = FileType::from_file_name(name)
        .ok_or_else(|| ExtratoError::UnsupportedFile(path.display().to_string()))?;
    read_grid(path, file_type)
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_card_amount_sign_rule() {
        assert_eq!(card_amount(dec("45.90"), "Uber *Trip"), dec("-45.90"));
        assert_eq!(card_amount(dec("1500.00"), "Pagamento recebido"), dec("1500.00"));
        assert_eq!(card_amount(dec("-1500.00"), "Pagamento recebido"), dec("1500.00"));
        assert_eq!(card_amount(dec("-20.00"), "Ajuste"), dec("20.00"));
        assert_eq!(card_amount(dec("30.00"), "ESTORNO DE COMPRA"), dec("30.00"));
    }

    #[test]
    fn test_hints() {
        assert!(has_extension("Extrato.TXT", &["txt"]));
        assert!(!has_extension("extrato.csv", &["txt"]));
        assert!(name_hint("Fatura_XP_2024.csv", "xp"));
        assert!(name_token("Fatura_XP_2024.csv", "xp"));
        assert!(name_token("xp.csv", "xp"));
        assert!(!name_token("itau_export.xls", "xp"));
        assert!(!name_token("expenses-2024.csv", "xp"));
        let lines = vec!["Data;Histórico;Crédito (R$)".to_string()];
        assert!(line_has_all(&lines, &["historico", "credito"]));
        assert!(!line_has_all(&lines, &["historico", "debito"]));
    }
}
