use std::sync::{Mutex, MutexGuard};

use chrono::{NaiveDate, Utc};

use crate::error::{ExtratoError, Result};
use crate::models::{Category, ImportSession, SessionStatus, StatusUpdate, TempTransaction, Transaction};
use crate::store::ImportStore;

#[derive(Default)]
struct State {
    sessions: Vec<ImportSession>,
    temps: Vec<TempTransaction>,
    transactions: Vec<Transaction>,
    categories: Vec<Category>,
}

/// In-process store for tests and embedding.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| ExtratoError::Other("memory store lock poisoned".into()))
    }

    pub fn add_transaction(&self, tx: Transaction) {
        if let Ok(mut state) = self.lock() {
            state.transactions.push(tx);
        }
    }

    pub fn add_category(&self, category: Category) {
        if let Ok(mut state) = self.lock() {
            state.categories.push(category);
        }
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.lock().map(|s| s.transactions.clone()).unwrap_or_default()
    }
}

fn apply_update(session: &mut ImportSession, update: &StatusUpdate) {
    session.status = update.status;
    if let Some(total) = update.total_transactions {
        session.total_transactions = total;
    }
    if update.bank_name.is_some() {
        session.bank_name = update.bank_name.clone();
    }
    if update.error_message.is_some() {
        session.error_message = update.error_message.clone();
    }
    session.processed_at = Some(Utc::now());
}

impl ImportStore for MemoryStore {
    fn create_session(&self, session: &ImportSession) -> Result<()> {
        self.lock()?.sessions.push(session.clone());
        Ok(())
    }

    fn find_session(&self, id: &str) -> Result<Option<ImportSession>> {
        Ok(self.lock()?.sessions.iter().find(|s| s.id == id).cloned())
    }

    fn list_sessions(&self, budget_id: Option<&str>) -> Result<Vec<ImportSession>> {
        let state = self.lock()?;
        let mut sessions: Vec<ImportSession> = state
            .sessions
            .iter()
            .filter(|s| budget_id.map_or(true, |b| s.budget_id == b))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    fn find_completed_by_checksum(&self, account_id: &str, checksum: &str) -> Result<Option<ImportSession>> {
        Ok(self
            .lock()?
            .sessions
            .iter()
            .find(|s| {
                s.account_id == account_id
                    && s.status == SessionStatus::Completed
                    && s.checksum.as_deref() == Some(checksum)
            })
            .cloned())
    }

    fn update_session_status(&self, id: &str, from: SessionStatus, update: &StatusUpdate) -> Result<bool> {
        let mut state = self.lock()?;
        match state.sessions.iter_mut().find(|s| s.id == id && s.status == from) {
            Some(session) => {
                apply_update(session, update);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn create_temp_transactions(&self, rows: &[TempTransaction]) -> Result<()> {
        self.lock()?.temps.extend_from_slice(rows);
        Ok(())
    }

    fn find_temp_transactions(&self, session_id: &str) -> Result<Vec<TempTransaction>> {
        let mut rows: Vec<TempTransaction> = self
            .lock()?
            .temps
            .iter()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect();
        rows.sort_by_key(|t| t.date);
        Ok(rows)
    }

    fn find_temp_transaction(&self, id: &str) -> Result<Option<TempTransaction>> {
        Ok(self.lock()?.temps.iter().find(|t| t.id == id).cloned())
    }

    fn update_temp_classification(&self, id: &str, category_id: &str) -> Result<TempTransaction> {
        let mut state = self.lock()?;
        let temp = state
            .temps
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| ExtratoError::TempTransactionNotFound(id.to_string()))?;
        temp.category_id = Some(category_id.to_string());
        temp.is_classified = true;
        Ok(temp.clone())
    }

    fn complete_session(&self, session_id: &str, transactions: &[Transaction]) -> Result<bool> {
        let mut state = self.lock()?;
        let Some(session) = state
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id && s.status == SessionStatus::Pending)
        else {
            return Ok(false);
        };
        apply_update(session, &StatusUpdate::to(SessionStatus::Completed));
        state.transactions.extend_from_slice(transactions);
        state.temps.retain(|t| t.session_id != session_id);
        Ok(true)
    }

    fn cancel_session(&self, id: &str, from: SessionStatus) -> Result<bool> {
        let mut state = self.lock()?;
        let Some(session) = state.sessions.iter_mut().find(|s| s.id == id && s.status == from) else {
            return Ok(false);
        };
        apply_update(session, &StatusUpdate::to(SessionStatus::Cancelled));
        state.temps.retain(|t| t.session_id != id);
        Ok(true)
    }

    fn find_existing_transactions(&self, account_id: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<Transaction>> {
        Ok(self
            .lock()?
            .transactions
            .iter()
            .filter(|t| t.account_id == account_id && t.date >= from && t.date <= to)
            .cloned()
            .collect())
    }

    fn category_belongs_to_budget(&self, category_id: &str, budget_id: &str) -> Result<bool> {
        Ok(self
            .lock()?
            .categories
            .iter()
            .any(|c| c.id == category_id && c.budget_id == budget_id))
    }

    fn categories_for_budget(&self, budget_id: &str) -> Result<Vec<Category>> {
        let mut categories: Vec<Category> = self
            .lock()?
            .categories
            .iter()
            .filter(|c| c.budget_id == budget_id)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }
}
