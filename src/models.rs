use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ExtratoError;

/// Raw source row kept for audit display. Its shape is dialect-specific.
pub type OriginalData = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "INCOME",
            Self::Expense => "EXPENSE",
        }
    }

    /// Negative amounts are expenses, everything else is income.
    pub fn from_signed(amount: Decimal) -> Self {
        if amount.is_sign_negative() {
            Self::Expense
        } else {
            Self::Income
        }
    }

    pub fn apply_sign(&self, magnitude: Decimal) -> Decimal {
        match self {
            Self::Income => magnitude.abs(),
            Self::Expense => -magnitude.abs(),
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = ExtratoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INCOME" => Ok(Self::Income),
            "EXPENSE" => Ok(Self::Expense),
            other => Err(ExtratoError::Other(format!("Unknown transaction type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Checking,
    CreditCard,
    Investment,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::CreditCard => "credit_card",
            Self::Investment => "investment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileType {
    Csv,
    Excel,
    Pdf,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Excel => "EXCEL",
            Self::Pdf => "PDF",
        }
    }

    /// Container type from a file name. Plain-text exports count as CSV.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = extension(name)?;
        match ext.as_str() {
            "csv" | "txt" => Some(Self::Csv),
            "xls" | "xlsx" | "xlsm" => Some(Self::Excel),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

impl FromStr for FileType {
    type Err = ExtratoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CSV" => Ok(Self::Csv),
            "EXCEL" => Ok(Self::Excel),
            "PDF" => Ok(Self::Pdf),
            other => Err(ExtratoError::Other(format!("Unknown file type: {other}"))),
        }
    }
}

/// Lowercased extension of a file name, without the dot.
pub fn extension(name: &str) -> Option<String> {
    std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Processing,
    Pending,
    Error,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "PROCESSING",
            Self::Pending => "PENDING",
            Self::Error => "ERROR",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error | Self::Completed | Self::Cancelled)
    }

    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, next),
            (Processing, Pending)
                | (Processing, Error)
                | (Processing, Cancelled)
                | (Pending, Completed)
                | (Pending, Cancelled)
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = ExtratoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PROCESSING" => Ok(Self::Processing),
            "PENDING" => Ok(Self::Pending),
            "ERROR" => Ok(Self::Error),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(ExtratoError::Other(format!("Unknown session status: {other}"))),
        }
    }
}

/// Inclusive date filter applied while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    pub date_range: Option<DateRange>,
    /// Rows dated after this day are rejected.
    pub today: NaiveDate,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            date_range: None,
            today: chrono::Local::now().date_naive(),
        }
    }
}

impl ParseOptions {
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn with_range(mut self, range: Option<DateRange>) -> Self {
        self.date_range = range;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedTransaction {
    pub description: String,
    /// Always positive; the sign lives in `kind`.
    pub amount: Decimal,
    pub kind: TransactionType,
    pub date: NaiveDate,
    pub original_data: OriginalData,
}

impl ParsedTransaction {
    pub fn signed_amount(&self) -> Decimal {
        self.kind.apply_sign(self.amount)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseResult {
    pub transactions: Vec<ParsedTransaction>,
    pub errors: Vec<String>,
    pub total_processed: usize,
    pub bank_name: Option<String>,
    pub account_type: Option<AccountKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateResult {
    pub is_duplicate: bool,
    pub reason: Option<String>,
    pub existing_transaction_id: Option<String>,
    pub similarity: f64,
}

impl DuplicateResult {
    pub fn unique() -> Self {
        Self {
            is_duplicate: false,
            reason: None,
            existing_transaction_id: None,
            similarity: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSession {
    pub id: String,
    pub filename: String,
    pub file_type: FileType,
    pub account_id: String,
    pub budget_id: String,
    pub status: SessionStatus,
    pub total_transactions: usize,
    pub bank_name: Option<String>,
    pub error_message: Option<String>,
    pub checksum: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl ImportSession {
    pub fn start(filename: &str, file_type: FileType, account_id: &str, budget_id: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            filename: filename.to_string(),
            file_type,
            account_id: account_id.to_string(),
            budget_id: budget_id.to_string(),
            status: SessionStatus::Processing,
            total_transactions: 0,
            bank_name: None,
            error_message: None,
            checksum: None,
            created_at: Utc::now(),
            processed_at: None,
        }
    }
}

/// Fields written alongside a status change.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: SessionStatus,
    pub total_transactions: Option<usize>,
    pub bank_name: Option<String>,
    pub error_message: Option<String>,
}

impl StatusUpdate {
    pub fn to(status: SessionStatus) -> Self {
        Self {
            status,
            total_transactions: None,
            bank_name: None,
            error_message: None,
        }
    }

    pub fn pending(total: usize, bank_name: Option<String>) -> Self {
        Self {
            status: SessionStatus::Pending,
            total_transactions: Some(total),
            bank_name,
            error_message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: SessionStatus::Error,
            total_transactions: None,
            bank_name: None,
            error_message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempTransaction {
    pub id: String,
    pub session_id: String,
    pub description: String,
    pub amount: Decimal,
    pub kind: TransactionType,
    pub date: NaiveDate,
    pub original_data: OriginalData,
    pub is_duplicate: bool,
    pub duplicate_reason: Option<String>,
    pub existing_transaction_id: Option<String>,
    pub similarity: f64,
    pub is_classified: bool,
    pub category_id: Option<String>,
}

impl TempTransaction {
    pub fn stage(session_id: &str, parsed: ParsedTransaction, duplicate: DuplicateResult) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            description: parsed.description,
            amount: parsed.amount,
            kind: parsed.kind,
            date: parsed.date,
            original_data: parsed.original_data,
            is_duplicate: duplicate.is_duplicate,
            duplicate_reason: duplicate.reason,
            existing_transaction_id: duplicate.existing_transaction_id,
            similarity: duplicate.similarity,
            is_classified: false,
            category_id: None,
        }
    }
}

/// A committed ledger transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub account_id: String,
    pub budget_id: String,
    pub category_id: Option<String>,
    pub description: String,
    pub amount: Decimal,
    pub kind: TransactionType,
    pub date: NaiveDate,
    pub import_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn signed_amount(&self) -> Decimal {
        self.kind.apply_sign(self.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub budget_id: String,
    pub name: String,
    pub kind: TransactionType,
}
