use thiserror::Error;

use crate::models::SessionStatus;

#[derive(Error, Debug)]
pub enum ExtratoError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "excel")]
    #[error("Excel error: {0}")]
    Excel(#[from] calamine::Error),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported file: {0}")]
    UnsupportedFile(String),

    #[error("Could not parse statement: {0}")]
    ParseFailed(String),

    #[error("No transactions found in file (session {session_id})")]
    NoTransactions {
        session_id: String,
        errors: Vec<String>,
    },

    #[error("Import session not found: {0}")]
    SessionNotFound(String),

    #[error("Staged transaction not found: {0}")]
    TempTransactionNotFound(String),

    #[error("Cannot move session from {from} to {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("Session {0} is not pending")]
    SessionNotPending(String),

    #[error("Category {category_id} does not belong to budget {budget_id}")]
    CategoryNotInBudget {
        category_id: String,
        budget_id: String,
    },

    #[error("Nothing to import: no classified transactions are eligible")]
    NothingToImport,

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ExtratoError>;
