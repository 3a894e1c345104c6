//! Locale-aware amount and date normalization.
//!
//! Everything here is a pure function. None of these helpers guess the sign of
//! a transaction; dialect parsers decide that.

use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

static THOUSANDS_DOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[1-9]\d{0,2}(\.\d{3})+$").unwrap());

/// Parse a monetary string into a signed decimal.
///
/// Accepts Brazilian ("1.234,56") and plain ("1234.56") notation, an optional
/// `R$` prefix, leading or trailing minus, parenthesized negatives and a
/// trailing `D`/`C` debit/credit marker.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let mut s: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '"')
        .collect();
    for prefix in ["R$", "r$", "$"] {
        s = s.replace(prefix, "");
    }
    if s.is_empty() {
        return None;
    }

    let mut negative = false;
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        negative = true;
        s = inner.to_string();
    }
    if let Some(rest) = s.strip_suffix(['D', 'd']) {
        if rest.ends_with(|c: char| c.is_ascii_digit()) {
            negative = true;
            s = rest.to_string();
        }
    } else if let Some(rest) = s.strip_suffix(['C', 'c']) {
        if rest.ends_with(|c: char| c.is_ascii_digit()) {
            s = rest.to_string();
        }
    }
    if let Some(rest) = s.strip_suffix('-') {
        negative = !negative;
        s = rest.to_string();
    }
    if let Some(rest) = s.strip_prefix('-') {
        negative = !negative;
        s = rest.to_string();
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest.to_string();
    }

    if s.is_empty()
        || !s.chars().any(|c| c.is_ascii_digit())
        || !s.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',')
    {
        return None;
    }

    let normalized = match (s.rfind(','), s.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(_), None) if s.matches(',').count() > 1 => s.replace(',', ""),
        (Some(_), None) => s.replace(',', "."),
        (None, Some(_)) if s.matches('.').count() > 1 || THOUSANDS_DOT.is_match(&s) => {
            s.replace('.', "")
        }
        _ => s,
    };

    let value = Decimal::from_str(&normalized).ok()?;
    Some(if negative { -value } else { value })
}

/// Decimal from a spreadsheet float, rounded to cents.
pub fn decimal_from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64_retain(value).map(|d| d.round_dp(2))
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

static DMY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4}|\d{2})$").unwrap());
static YMD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})[\-/](\d{1,2})[\-/](\d{1,2})$").unwrap());
static DM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,2})[/.\-](\d{1,2})$").unwrap());
static PT_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})(?:\s+de)?[\s/\-]+([a-z]{3})[a-z]*\.?(?:(?:\s+de)?[\s/\-]+(\d{4}|\d{2}))?$").unwrap()
});

const PT_MONTHS: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

/// Serial day numbers that plausibly encode a date (1954..2119).
const EXCEL_SERIAL_RANGE: std::ops::RangeInclusive<f64> = 20_000.0..=80_000.0;

fn expand_year(raw: &str) -> Option<i32> {
    let year: i32 = raw.parse().ok()?;
    Some(if raw.len() == 2 { 2000 + year } else { year })
}

fn pt_month(abbrev: &str) -> Option<u32> {
    PT_MONTHS
        .iter()
        .position(|m| *m == abbrev)
        .map(|i| i as u32 + 1)
        .or(match abbrev {
            // English exports from the same banks
            "feb" => Some(2),
            "apr" => Some(4),
            "may" => Some(5),
            "aug" => Some(8),
            "sep" => Some(9),
            "oct" => Some(10),
            "dec" => Some(12),
            _ => None,
        })
}

/// Drop a trailing time of day: "31/12/24 às 10:00:00", "2024-12-31T10:00".
fn strip_time(s: &str) -> &str {
    let s = s.split(" às ").next().unwrap_or(s);
    let s = s.split(" as ").next().unwrap_or(s);
    let s = s.split('T').next().unwrap_or(s);
    s.split_whitespace().next().unwrap_or(s)
}

/// Parse a statement date. Time of day is discarded.
///
/// Handles DD/MM/YYYY, DD/MM/YY, DD-MM-YYYY, DD.MM.YYYY, ISO dates with or
/// without a time part, "02 JAN 2024" and Excel serial numbers.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim().trim_matches('"').trim();
    if s.is_empty() {
        return None;
    }

    let folded = fold(s);
    if let Some(caps) = PT_MONTH.captures(&folded) {
        let year = caps.get(3).and_then(|y| expand_year(y.as_str()))?;
        return NaiveDate::from_ymd_opt(year, pt_month(&caps[2])?, caps[1].parse().ok()?);
    }

    let s = strip_time(s);
    if let Some(caps) = DMY.captures(s) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(expand_year(&caps[3])?, month, day);
    }
    if let Some(caps) = YMD.captures(s) {
        return NaiveDate::from_ymd_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?);
    }
    if let Ok(serial) = s.parse::<f64>() {
        if EXCEL_SERIAL_RANGE.contains(&serial) {
            return excel_serial_to_date(serial);
        }
    }
    None
}

/// Parse a day/month without a year ("02/01", "02 JAN") using `year`.
pub fn parse_day_month(raw: &str, year: i32) -> Option<NaiveDate> {
    let s = fold(raw.trim());
    if let Some(caps) = DM.captures(&s) {
        return NaiveDate::from_ymd_opt(year, caps[2].parse().ok()?, caps[1].parse().ok()?);
    }
    if let Some(caps) = PT_MONTH.captures(&s) {
        let year = caps.get(3).and_then(|y| expand_year(y.as_str())).unwrap_or(year);
        return NaiveDate::from_ymd_opt(year, pt_month(&caps[2])?, caps[1].parse().ok()?);
    }
    parse_date(raw)
}

pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::days(serial.trunc() as i64))
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

fn strip_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'u',
        'ç' | 'Ç' => 'c',
        'ñ' | 'Ñ' => 'n',
        _ => c,
    }
}

/// Lowercase, strip Portuguese accents and collapse whitespace. Used for all
/// header and keyword matching.
pub fn fold(s: &str) -> String {
    let lowered: String = s
        .chars()
        .map(strip_accent)
        .flat_map(char::to_lowercase)
        .map(|c| if c == '\u{a0}' { ' ' } else { c })
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trim, unquote and collapse internal whitespace of a description.
pub fn clean_description(raw: &str) -> String {
    raw.trim()
        .trim_matches('"')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

static NOISE_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(saldo( |$)|saldos( |$)|total( |$)|subtotal)",
        r"|nao ha lancamentos|sem lancamentos|nenhum lancamento|nao existem lancamentos",
    ))
    .unwrap()
});

/// Balance, total and "no transactions" rows that are skipped silently.
pub fn is_noise_row(description: &str) -> bool {
    NOISE_ROW.is_match(&fold(description))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_amount_brazilian_forms() {
        assert_eq!(parse_amount("1.234,56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("-1.234,56"), Some(dec("-1234.56")));
        assert_eq!(parse_amount("(1.234,56)"), Some(dec("-1234.56")));
        assert_eq!(parse_amount("R$ 1.234,56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("R$ -1.234,56"), Some(dec("-1234.56")));
        assert_eq!(parse_amount("-R$ 1.234,56"), Some(dec("-1234.56")));
        assert_eq!(parse_amount("(R$ 1.234,56)"), Some(dec("-1234.56")));
    }

    #[test]
    fn test_parse_amount_plain_forms() {
        assert_eq!(parse_amount("45.90"), Some(dec("45.90")));
        assert_eq!(parse_amount("-120.5"), Some(dec("-120.5")));
        assert_eq!(parse_amount("1,234.56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("1234"), Some(dec("1234")));
        assert_eq!(parse_amount("\"2.000,00\""), Some(dec("2000.00")));
        assert_eq!(parse_amount("1.234.567,89"), Some(dec("1234567.89")));
        assert_eq!(parse_amount("1.500"), Some(dec("1500")));
        assert_eq!(parse_amount("0.123"), Some(dec("0.123")));
    }

    #[test]
    fn test_parse_amount_markers() {
        assert_eq!(parse_amount("50,00-"), Some(dec("-50.00")));
        assert_eq!(parse_amount("50,00 D"), Some(dec("-50.00")));
        assert_eq!(parse_amount("50,00 C"), Some(dec("50.00")));
        assert_eq!(parse_amount("+10,00"), Some(dec("10.00")));
        assert_eq!(parse_amount("R$\u{a0}10,00"), Some(dec("10.00")));
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("-"), None);
        assert_eq!(parse_amount("R$"), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("12a,00"), None);
    }

    #[test]
    fn test_parse_date_same_day_forms() {
        let expected = Some(ymd(2024, 12, 31));
        assert_eq!(parse_date("31/12/2024"), expected);
        assert_eq!(parse_date("2024-12-31"), expected);
        assert_eq!(parse_date("31/12/24 às 10:00:00"), expected);
        assert_eq!(parse_date("31/12/2024 10:15"), expected);
        assert_eq!(parse_date("2024-12-31T23:59:59"), expected);
        assert_eq!(parse_date("31-12-2024"), expected);
        assert_eq!(parse_date("31.12.2024"), expected);
        assert_eq!(parse_date("31 DEZ 2024"), expected);
        assert_eq!(parse_date("31 de dezembro de 2024"), expected);
        assert_eq!(parse_date("45657"), expected);
    }

    #[test]
    fn test_parse_date_rejects_invalid() {
        assert_eq!(parse_date("31/02/2024"), None);
        assert_eq!(parse_date("13/13/2024"), None);
        assert_eq!(parse_date("data"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("12"), None);
    }

    #[test]
    fn test_parse_day_month() {
        assert_eq!(parse_day_month("02/01", 2024), Some(ymd(2024, 1, 2)));
        assert_eq!(parse_day_month("15 MAR", 2024), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_day_month("15/03/2023", 2024), Some(ymd(2023, 3, 15)));
    }

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(excel_serial_to_date(45667.0), Some(ymd(2025, 1, 10)));
        assert_eq!(excel_serial_to_date(45292.75), Some(ymd(2024, 1, 1)));
        assert_eq!(excel_serial_to_date(f64::NAN), None);
    }

    #[test]
    fn test_decimal_from_f64_rounds_to_cents() {
        assert_eq!(decimal_from_f64(45.9), Some(dec("45.90")));
        assert_eq!(decimal_from_f64(-1234.5), Some(dec("-1234.50")));
        assert_eq!(decimal_from_f64(f64::INFINITY), None);
    }

    #[test]
    fn test_fold() {
        assert_eq!(fold("  Descrição   do  Lançamento "), "descricao do lancamento");
        assert_eq!(fold("CRÉDITO (R$)"), "credito (r$)");
    }

    #[test]
    fn test_noise_rows() {
        assert!(is_noise_row("SALDO ANTERIOR"));
        assert!(is_noise_row("Saldo do dia"));
        assert!(is_noise_row("Total"));
        assert!(is_noise_row("Não há lançamentos para o período"));
        assert!(!is_noise_row("Saldanha Padaria"));
        assert!(!is_noise_row("PIX TRANSF JOAO"));
    }
}
