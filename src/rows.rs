//! Row-level validation shared by every parser.
//!
//! Parsers hand each candidate row to a [`RowSink`], which applies the common
//! rules (valid date, non-blank description, non-zero amount, not in the
//! future, inside the requested range) and records one error string per
//! rejected row.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::models::{AccountKind, OriginalData, ParseOptions, ParseResult, ParsedTransaction, TransactionType};

/// A candidate row after column mapping, before validation.
#[derive(Debug, Clone)]
pub struct RawRow {
    /// 1-based line or row number in the source file.
    pub line: usize,
    pub date: Option<NaiveDate>,
    pub raw_date: String,
    pub description: String,
    /// Signed: negative means money leaving the account.
    pub amount: Option<Decimal>,
    pub raw_amount: String,
    pub original: OriginalData,
}

pub struct RowSink<'a> {
    bank: Option<&'static str>,
    options: &'a ParseOptions,
    result: ParseResult,
}

impl<'a> RowSink<'a> {
    pub fn new(bank: &'static str, account_type: AccountKind, options: &'a ParseOptions) -> Self {
        Self {
            bank: Some(bank),
            options,
            result: ParseResult {
                bank_name: Some(bank.to_string()),
                account_type: Some(account_type),
                ..ParseResult::default()
            },
        }
    }

    /// Sink for the generic fallback parsers, which carry no bank name.
    pub fn generic(options: &'a ParseOptions) -> Self {
        Self {
            bank: None,
            options,
            result: ParseResult::default(),
        }
    }

    pub fn options(&self) -> &ParseOptions {
        self.options
    }

    /// Validate and record one row. Returns true if it became a transaction.
    pub fn push(&mut self, row: RawRow) -> bool {
        self.result.total_processed += 1;
        let line = row.line;

        let Some(date) = row.date else {
            return self.reject(line, format!("invalid date \"{}\"", row.raw_date.trim()));
        };
        if row.description.trim().is_empty() {
            return self.reject(line, "empty description".to_string());
        }
        let Some(amount) = row.amount else {
            return self.reject(line, format!("invalid amount \"{}\"", row.raw_amount.trim()));
        };
        if amount.is_zero() {
            return self.reject(line, "zero amount".to_string());
        }
        if date > self.options.today {
            return self.reject(line, format!("date {} is in the future", date.format("%d/%m/%Y")));
        }
        if let Some(range) = &self.options.date_range {
            if !range.contains(date) {
                return false;
            }
        }

        let mut original = row.original;
        if let Some(bank) = self.bank {
            original.insert("bank".to_string(), Value::String(bank.to_string()));
        }
        original.insert("line".to_string(), Value::from(line as u64));

        self.result.transactions.push(ParsedTransaction {
            description: row.description.trim().to_string(),
            amount: amount.abs(),
            kind: TransactionType::from_signed(amount),
            date,
            original_data: original,
        });
        true
    }

    /// Count a row that could not even be mapped into columns.
    pub fn error(&mut self, line: usize, message: impl Into<String>) {
        self.result.total_processed += 1;
        self.reject(line, message.into());
    }

    fn reject(&mut self, line: usize, message: String) -> bool {
        self.result.errors.push(format!("Line {line}: {message}"));
        false
    }

    /// Most recently accepted transaction, for dialects that continue a
    /// description on the following row.
    pub fn last_mut(&mut self) -> Option<&mut ParsedTransaction> {
        self.result.transactions.last_mut()
    }

    pub fn accepted(&self) -> usize {
        self.result.transactions.len()
    }

    pub fn finish(self) -> ParseResult {
        self.result
    }
}
