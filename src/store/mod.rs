//! Persistence port for import sessions, staged rows and the ledger.

pub mod memory;
pub mod sqlite;

use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{Category, ImportSession, SessionStatus, StatusUpdate, TempTransaction, Transaction};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Record store consumed by the import workflow.
///
/// Status writes are compare-and-set: they only apply while the session is
/// still in `from`, and report whether they did.
pub trait ImportStore: Send + Sync {
    fn create_session(&self, session: &ImportSession) -> Result<()>;
    fn find_session(&self, id: &str) -> Result<Option<ImportSession>>;
    /// Newest first. `None` lists every budget.
    fn list_sessions(&self, budget_id: Option<&str>) -> Result<Vec<ImportSession>>;
    /// A completed session for the same account and file contents, if any.
    fn find_completed_by_checksum(&self, account_id: &str, checksum: &str) -> Result<Option<ImportSession>>;
    fn update_session_status(&self, id: &str, from: SessionStatus, update: &StatusUpdate) -> Result<bool>;

    /// Stage rows in one batch.
    fn create_temp_transactions(&self, rows: &[TempTransaction]) -> Result<()>;
    /// Staged rows of a session, ordered by date.
    fn find_temp_transactions(&self, session_id: &str) -> Result<Vec<TempTransaction>>;
    fn find_temp_transaction(&self, id: &str) -> Result<Option<TempTransaction>>;
    fn update_temp_classification(&self, id: &str, category_id: &str) -> Result<TempTransaction>;

    /// Insert `transactions`, drop the session's staged rows and move it from
    /// `Pending` to `Completed`, all or nothing.
    fn complete_session(&self, session_id: &str, transactions: &[Transaction]) -> Result<bool>;
    /// Move the session from `from` to `Cancelled` and drop its staged rows.
    fn cancel_session(&self, id: &str, from: SessionStatus) -> Result<bool>;

    /// Ledger rows of an account dated within `[from, to]`.
    fn find_existing_transactions(&self, account_id: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<Transaction>>;
    fn category_belongs_to_budget(&self, category_id: &str, budget_id: &str) -> Result<bool>;
    fn categories_for_budget(&self, budget_id: &str) -> Result<Vec<Category>>;
}
