use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

use crate::db::{get_connection, init_db};
use crate::error::{ExtratoError, Result};
use crate::models::{
    Category, ImportSession, OriginalData, SessionStatus, StatusUpdate, TempTransaction, Transaction,
};
use crate::store::ImportStore;

const SESSION_COLUMNS: &str = "id, filename, file_type, account_id, budget_id, status, total_transactions, \
     bank_name, error_message, checksum, created_at, processed_at";

const TEMP_COLUMNS: &str = "id, session_id, description, amount, transaction_type, date, original_data, \
     is_duplicate, duplicate_reason, existing_transaction_id, similarity, is_classified, category_id";

const TRANSACTION_COLUMNS: &str = "id, account_id, budget_id, category_id, description, amount, \
     transaction_type, date, import_session_id, created_at";

/// SQLite-backed store. One connection behind a mutex.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = get_connection(path)?;
        init_db(&conn)?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn: Mutex::new(conn) }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ExtratoError::Other("database connection lock poisoned".into()))
    }
}

fn conversion_error(idx: usize, e: impl std::fmt::Display) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.to_string().into())
}

fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| conversion_error(idx, e))
}

fn json_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<OriginalData> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<ImportSession> {
    let total: i64 = row.get(6)?;
    Ok(ImportSession {
        id: row.get(0)?,
        filename: row.get(1)?,
        file_type: parse_column(row, 2)?,
        account_id: row.get(3)?,
        budget_id: row.get(4)?,
        status: parse_column(row, 5)?,
        total_transactions: usize::try_from(total).map_err(|e| conversion_error(6, e))?,
        bank_name: row.get(7)?,
        error_message: row.get(8)?,
        checksum: row.get(9)?,
        created_at: row.get(10)?,
        processed_at: row.get(11)?,
    })
}

fn temp_from_row(row: &Row<'_>) -> rusqlite::Result<TempTransaction> {
    Ok(TempTransaction {
        id: row.get(0)?,
        session_id: row.get(1)?,
        description: row.get(2)?,
        amount: parse_column::<Decimal>(row, 3)?,
        kind: parse_column(row, 4)?,
        date: row.get(5)?,
        original_data: json_column(row, 6)?,
        is_duplicate: row.get(7)?,
        duplicate_reason: row.get(8)?,
        existing_transaction_id: row.get(9)?,
        similarity: row.get(10)?,
        is_classified: row.get(11)?,
        category_id: row.get(12)?,
    })
}

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        budget_id: row.get(2)?,
        category_id: row.get(3)?,
        description: row.get(4)?,
        amount: parse_column::<Decimal>(row, 5)?,
        kind: parse_column(row, 6)?,
        date: row.get(7)?,
        import_session_id: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn write_status(conn: &Connection, id: &str, from: SessionStatus, update: &StatusUpdate) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE import_sessions SET
            status = ?1,
            total_transactions = COALESCE(?2, total_transactions),
            bank_name = COALESCE(?3, bank_name),
            error_message = COALESCE(?4, error_message),
            processed_at = ?5
         WHERE id = ?6 AND status = ?7",
        params![
            update.status.as_str(),
            update.total_transactions.map(|n| n as i64),
            update.bank_name,
            update.error_message,
            Utc::now(),
            id,
            from.as_str(),
        ],
    )?;
    Ok(changed == 1)
}

impl ImportStore for SqliteStore {
    fn create_session(&self, session: &ImportSession) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            &format!("INSERT INTO import_sessions ({SESSION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"),
            params![
                session.id,
                session.filename,
                session.file_type.as_str(),
                session.account_id,
                session.budget_id,
                session.status.as_str(),
                session.total_transactions as i64,
                session.bank_name,
                session.error_message,
                session.checksum,
                session.created_at,
                session.processed_at,
            ],
        )?;
        Ok(())
    }

    fn find_session(&self, id: &str) -> Result<Option<ImportSession>> {
        let conn = self.conn()?;
        let session = conn
            .query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM import_sessions WHERE id = ?1"),
                [id],
                session_from_row,
            )
            .optional()?;
        Ok(session)
    }

    fn list_sessions(&self, budget_id: Option<&str>) -> Result<Vec<ImportSession>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM import_sessions
             WHERE ?1 IS NULL OR budget_id = ?1
             ORDER BY created_at DESC"
        ))?;
        let sessions = stmt
            .query_map([budget_id], session_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    fn find_completed_by_checksum(&self, account_id: &str, checksum: &str) -> Result<Option<ImportSession>> {
        let conn = self.conn()?;
        let session = conn
            .query_row(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM import_sessions
                     WHERE account_id = ?1 AND checksum = ?2 AND status = 'COMPLETED'
                     ORDER BY created_at DESC LIMIT 1"
                ),
                [account_id, checksum],
                session_from_row,
            )
            .optional()?;
        Ok(session)
    }

    fn update_session_status(&self, id: &str, from: SessionStatus, update: &StatusUpdate) -> Result<bool> {
        let conn = self.conn()?;
        write_status(&conn, id, from, update)
    }

    fn create_temp_transactions(&self, rows: &[TempTransaction]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO temp_transactions ({TEMP_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
            ))?;
            for row in rows {
                stmt.execute(params![
                    row.id,
                    row.session_id,
                    row.description,
                    row.amount.to_string(),
                    row.kind.as_str(),
                    row.date,
                    serde_json::to_string(&row.original_data)?,
                    row.is_duplicate,
                    row.duplicate_reason,
                    row.existing_transaction_id,
                    row.similarity,
                    row.is_classified,
                    row.category_id,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn find_temp_transactions(&self, session_id: &str) -> Result<Vec<TempTransaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TEMP_COLUMNS} FROM temp_transactions WHERE session_id = ?1 ORDER BY date, rowid"
        ))?;
        let rows = stmt
            .query_map([session_id], temp_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn find_temp_transaction(&self, id: &str) -> Result<Option<TempTransaction>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {TEMP_COLUMNS} FROM temp_transactions WHERE id = ?1"),
                [id],
                temp_from_row,
            )
            .optional()?;
        Ok(row)
    }

    fn update_temp_classification(&self, id: &str, category_id: &str) -> Result<TempTransaction> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE temp_transactions SET category_id = ?1, is_classified = 1 WHERE id = ?2",
            [category_id, id],
        )?;
        if changed == 0 {
            return Err(ExtratoError::TempTransactionNotFound(id.to_string()));
        }
        let row = conn.query_row(
            &format!("SELECT {TEMP_COLUMNS} FROM temp_transactions WHERE id = ?1"),
            [id],
            temp_from_row,
        )?;
        Ok(row)
    }

    fn complete_session(&self, session_id: &str, transactions: &[Transaction]) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        if !write_status(&tx, session_id, SessionStatus::Pending, &StatusUpdate::to(SessionStatus::Completed))? {
            // Dropping `tx` rolls back.
            return Ok(false);
        }
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO transactions ({TRANSACTION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ))?;
            for t in transactions {
                stmt.execute(params![
                    t.id,
                    t.account_id,
                    t.budget_id,
                    t.category_id,
                    t.description,
                    t.amount.to_string(),
                    t.kind.as_str(),
                    t.date,
                    t.import_session_id,
                    t.created_at,
                ])?;
            }
        }
        tx.execute("DELETE FROM temp_transactions WHERE session_id = ?1", [session_id])?;
        tx.commit()?;
        Ok(true)
    }

    fn cancel_session(&self, id: &str, from: SessionStatus) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        if !write_status(&tx, id, from, &StatusUpdate::to(SessionStatus::Cancelled))? {
            return Ok(false);
        }
        tx.execute("DELETE FROM temp_transactions WHERE session_id = ?1", [id])?;
        tx.commit()?;
        Ok(true)
    }

    fn find_existing_transactions(&self, account_id: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions
             WHERE account_id = ?1 AND date BETWEEN ?2 AND ?3"
        ))?;
        let rows = stmt
            .query_map(params![account_id, from, to], transaction_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn category_belongs_to_budget(&self, category_id: &str, budget_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let exists = conn
            .prepare_cached("SELECT 1 FROM categories WHERE id = ?1 AND budget_id = ?2")?
            .exists([category_id, budget_id])?;
        Ok(exists)
    }

    fn categories_for_budget(&self, budget_id: &str) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, budget_id, name, category_type FROM categories WHERE budget_id = ?1 ORDER BY name",
        )?;
        let categories = stmt
            .query_map([budget_id], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    budget_id: row.get(1)?,
                    name: row.get(2)?,
                    kind: parse_column(row, 3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(categories)
    }
}
