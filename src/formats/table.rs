use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::models::OriginalData;
use crate::normalize::{decimal_from_f64, excel_serial_to_date, fold, parse_amount, parse_date};

/// A spreadsheet or CSV cell reduced to a plain scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_amount(&self) -> Option<Decimal> {
        match self {
            Cell::Number(n) => decimal_from_f64(*n),
            Cell::Text(s) => parse_amount(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            Cell::Number(n) => excel_serial_to_date(*n),
            Cell::Text(s) => parse_date(s),
            Cell::Empty => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Cell::Empty => Value::Null,
            Cell::Number(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
            other => Value::String(other.text()),
        }
    }
}

pub type Row = Vec<Cell>;

pub fn row_is_blank(row: &[Cell]) -> bool {
    row.iter().all(Cell::is_empty)
}

static EMPTY: Cell = Cell::Empty;

pub fn cell(row: &[Cell], idx: usize) -> &Cell {
    row.get(idx).unwrap_or(&EMPTY)
}

pub fn cell_text(row: &[Cell], idx: usize) -> String {
    cell(row, idx).text()
}

/// Grid of rows from the first worksheet or a delimited text file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub rows: Vec<Row>,
}

impl Table {
    pub fn from_records(records: Vec<Vec<String>>) -> Self {
        let rows = records
            .into_iter()
            .map(|r| {
                r.into_iter()
                    .map(|s| if s.trim().is_empty() { Cell::Empty } else { Cell::Text(s) })
                    .collect()
            })
            .collect();
        Self { rows }
    }

    /// First `n` non-blank rows rendered as `;`-joined text, for recognizers.
    pub fn first_lines(&self, n: usize) -> Vec<String> {
        self.rows
            .iter()
            .filter(|r| !row_is_blank(r))
            .take(n)
            .map(|r| r.iter().map(Cell::text).collect::<Vec<_>>().join(";"))
            .collect()
    }

    /// Index of the first row (within `limit`) where every needle is a
    /// substring of some folded cell.
    pub fn find_header(&self, needles: &[&str], limit: usize) -> Option<usize> {
        self.rows.iter().take(limit).position(|row| {
            let folded: Vec<String> = row.iter().map(|c| fold(&c.text())).collect();
            needles.iter().all(|n| folded.iter().any(|f| f.contains(n)))
        })
    }
}

/// Header lookup by folded column name.
#[derive(Debug, Clone)]
pub struct Columns {
    names: Vec<String>,
    folded: Vec<String>,
}

impl Columns {
    pub fn from_header(row: &[Cell]) -> Self {
        let names: Vec<String> = row.iter().map(Cell::text).collect();
        let folded = names.iter().map(|n| fold(n)).collect();
        Self { names, folded }
    }

    /// Exact folded match on any synonym, then prefix match, in synonym order.
    pub fn find(&self, synonyms: &[&str]) -> Option<usize> {
        for syn in synonyms {
            if let Some(i) = self.folded.iter().position(|f| f == syn) {
                return Some(i);
            }
        }
        for syn in synonyms {
            if let Some(i) = self.folded.iter().position(|f| f.starts_with(syn)) {
                return Some(i);
            }
        }
        None
    }

    /// Like `find`, but skips columns whose name contains any of `exclude`.
    pub fn find_excluding(&self, synonyms: &[&str], exclude: &[&str]) -> Option<usize> {
        let allowed = |i: &usize| !exclude.iter().any(|x| self.folded[*i].contains(x));
        for syn in synonyms {
            if let Some(i) = (0..self.folded.len()).filter(allowed).find(|i| self.folded[*i] == *syn) {
                return Some(i);
            }
        }
        for syn in synonyms {
            if let Some(i) = (0..self.folded.len())
                .filter(allowed)
                .find(|i| self.folded[*i].starts_with(syn))
            {
                return Some(i);
            }
        }
        None
    }

    pub fn name(&self, idx: usize) -> Option<&str> {
        self.names.get(idx).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Raw row keyed by header name, for `original_data`.
    pub fn original(&self, row: &[Cell]) -> OriginalData {
        let mut map = OriginalData::new();
        for (i, value) in row.iter().enumerate() {
            let key = match self.names.get(i) {
                Some(name) if !name.is_empty() => name.clone(),
                _ => format!("col{i}"),
            };
            map.insert(key, value.to_json());
        }
        map
    }
}

/// Raw row keyed by position, for headerless dialects.
pub fn positional_original(row: &[Cell]) -> OriginalData {
    let mut map = OriginalData::new();
    for (i, value) in row.iter().enumerate() {
        map.insert(format!("col{i}"), value.to_json());
    }
    map
}

// ---------------------------------------------------------------------------
// Generic column layout, shared by the fallback CSV and Excel parsers
// ---------------------------------------------------------------------------

pub const DATE_COLUMNS: &[&str] = &[
    "data",
    "date",
    "data lancamento",
    "data do lancamento",
    "data movimento",
    "data de compra",
    "data e hora",
    "dt",
];
pub const DESCRIPTION_COLUMNS: &[&str] = &[
    "descricao",
    "historico",
    "lancamento",
    "description",
    "title",
    "estabelecimento",
    "memo",
    "detalhes",
    "transacao",
];
pub const AMOUNT_COLUMNS: &[&str] = &["valor", "amount", "value", "quantia", "montante"];
pub const CREDIT_COLUMNS: &[&str] = &["credito", "entrada", "credit"];
pub const DEBIT_COLUMNS: &[&str] = &["debito", "saida", "debit"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountLayout {
    Signed(usize),
    CreditDebit { credit: usize, debit: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericLayout {
    pub header_row: usize,
    pub date: usize,
    pub description: usize,
    pub amount: AmountLayout,
}

impl GenericLayout {
    /// Hunt for a header row among the first `limit` rows, skipping preambles.
    pub fn detect(table: &Table, limit: usize) -> Option<(Self, Columns)> {
        for (idx, row) in table.rows.iter().enumerate().take(limit) {
            if row_is_blank(row) {
                continue;
            }
            let cols = Columns::from_header(row);
            let Some(date) = cols.find_excluding(DATE_COLUMNS, &["saldo"]) else {
                continue;
            };
            let amount = match cols.find_excluding(AMOUNT_COLUMNS, &["saldo", "us$", "cotacao"]) {
                Some(i) => Some(AmountLayout::Signed(i)),
                None => match (cols.find(CREDIT_COLUMNS), cols.find(DEBIT_COLUMNS)) {
                    (Some(credit), Some(debit)) => Some(AmountLayout::CreditDebit { credit, debit }),
                    _ => None,
                },
            };
            let Some(amount) = amount else { continue };
            let description = cols
                .find_excluding(DESCRIPTION_COLUMNS, &["data"])
                .or_else(|| (0..cols.len()).find(|i| *i != date && !is_amount_col(amount, *i)));
            let Some(description) = description else { continue };
            return Some((
                Self {
                    header_row: idx,
                    date,
                    description,
                    amount,
                },
                cols,
            ));
        }
        None
    }

    pub fn amount(&self, row: &[Cell]) -> Option<Decimal> {
        match self.amount {
            AmountLayout::Signed(i) => cell(row, i).as_amount(),
            AmountLayout::CreditDebit { credit, debit } => credit_debit_amount(row, credit, debit),
        }
    }

    pub fn raw_amount(&self, row: &[Cell]) -> String {
        match self.amount {
            AmountLayout::Signed(i) => cell_text(row, i),
            AmountLayout::CreditDebit { credit, debit } => {
                format!("{}|{}", cell_text(row, credit), cell_text(row, debit))
            }
        }
    }
}

/// Signed amount from a credit/debit column pair. Either side may be blank,
/// not both.
pub fn credit_debit_amount(row: &[Cell], credit: usize, debit: usize) -> Option<Decimal> {
    let c = cell(row, credit);
    let d = cell(row, debit);
    if c.is_empty() && d.is_empty() {
        return None;
    }
    let credit = if c.is_empty() { Some(Decimal::ZERO) } else { c.as_amount() }?;
    let debit = if d.is_empty() { Some(Decimal::ZERO) } else { d.as_amount() }?;
    Some(credit.abs() - debit.abs())
}

fn is_amount_col(layout: AmountLayout, i: usize) -> bool {
    match layout {
        AmountLayout::Signed(a) => a == i,
        AmountLayout::CreditDebit { credit, debit } => credit == i || debit == i,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn text_row(cells: &[&str]) -> Row {
        cells
            .iter()
            .map(|s| if s.is_empty() { Cell::Empty } else { Cell::Text(s.to_string()) })
            .collect()
    }

    #[test]
    fn test_cell_conversions() {
        assert_eq!(Cell::Number(45292.0).as_date(), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(Cell::Number(-50.5).as_amount(), Decimal::from_str("-50.50").ok());
        assert_eq!(Cell::Text("R$ 1.234,56".into()).as_amount(), Decimal::from_str("1234.56").ok());
        assert_eq!(Cell::Number(42.0).text(), "42");
        assert!(Cell::Text("   ".into()).is_empty());
    }

    #[test]
    fn test_generic_layout_skips_preamble() {
        let table = Table {
            rows: vec![
                text_row(&["Extrato de conta", ""]),
                text_row(&["Período: 01/01/2024 a 31/01/2024"]),
                text_row(&[]),
                text_row(&["Data", "Descrição", "Valor (R$)", "Saldo (R$)"]),
                text_row(&["02/01/2024", "PIX", "-10,00", "90,00"]),
            ],
        };
        let (layout, _) = GenericLayout::detect(&table, 20).unwrap();
        assert_eq!(layout.header_row, 3);
        assert_eq!(layout.date, 0);
        assert_eq!(layout.description, 1);
        assert_eq!(layout.amount, AmountLayout::Signed(2));
    }

    #[test]
    fn test_generic_layout_credit_debit() {
        let table = Table {
            rows: vec![text_row(&["Data", "Histórico", "Crédito (R$)", "Débito (R$)", "Saldo (R$)"])],
        };
        let (layout, _) = GenericLayout::detect(&table, 5).unwrap();
        assert_eq!(layout.amount, AmountLayout::CreditDebit { credit: 2, debit: 3 });
        let row = text_row(&["02/01/2024", "TED", "", "150,00", ""]);
        assert_eq!(layout.amount(&row), Decimal::from_str("-150.00").ok());
    }

    #[test]
    fn test_find_header_is_accent_insensitive() {
        let table = Table {
            rows: vec![
                text_row(&["lixo"]),
                text_row(&["DATA", "HISTÓRICO", "CRÉDITO"]),
            ],
        };
        assert_eq!(table.find_header(&["historico", "credito"], 10), Some(1));
        assert_eq!(table.find_header(&["debito"], 10), None);
    }

    #[test]
    fn test_columns_original_uses_header_names() {
        let cols = Columns::from_header(&text_row(&["Data", "", "Valor"]));
        let original = cols.original(&text_row(&["02/01/2024", "x", "1,00"]));
        assert_eq!(original["Data"], Value::String("02/01/2024".into()));
        assert_eq!(original["col1"], Value::String("x".into()));
    }
}
