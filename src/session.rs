//! Import session orchestration: upload, classify, confirm or cancel.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::banks::BankParserRegistry;
use crate::duplicates::{DuplicateConfig, DuplicateDetector};
use crate::error::{ExtratoError, Result};
use crate::models::{
    extension, Category, DateRange, FileType, ImportSession, ParseOptions, ParseResult, SessionStatus,
    StatusUpdate, TempTransaction, Transaction, TransactionType,
};
use crate::pipeline;
use crate::store::ImportStore;

/// An uploaded statement: the user-facing file name and its raw bytes.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ExtratoError::UnsupportedFile(path.display().to_string()))?
            .to_string();
        Ok(Self {
            file_name,
            bytes: std::fs::read(path)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadSummary {
    pub session_id: String,
    pub total_transactions: usize,
    pub duplicates_found: usize,
    pub errors: Vec<String>,
    pub bank_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSummary {
    pub total: usize,
    pub classified: usize,
    pub unclassified: usize,
    pub duplicates: usize,
    pub income_total: Decimal,
    pub expense_total: Decimal,
}

impl SessionSummary {
    pub fn of(rows: &[TempTransaction]) -> Self {
        let mut summary = Self {
            total: rows.len(),
            ..Self::default()
        };
        for row in rows {
            if row.is_classified {
                summary.classified += 1;
            }
            if row.is_duplicate {
                summary.duplicates += 1;
            }
            match row.kind {
                TransactionType::Income => summary.income_total += row.amount,
                TransactionType::Expense => summary.expense_total += row.amount,
            }
        }
        summary.unclassified = summary.total - summary.classified;
        summary
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionDetails {
    pub session: ImportSession,
    pub transactions: Vec<TempTransaction>,
    pub available_categories: Vec<Category>,
    pub summary: SessionSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmSummary {
    pub imported_count: usize,
    pub transaction_ids: Vec<String>,
    /// Staged rows dropped because they were never classified.
    pub discarded_unclassified: usize,
}

pub struct ImportService<S: ImportStore> {
    store: S,
    registry: BankParserRegistry,
    duplicates: DuplicateConfig,
    today: Option<NaiveDate>,
    temp_dir: Option<PathBuf>,
}

impl<S: ImportStore> ImportService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            registry: BankParserRegistry::default_order(),
            duplicates: DuplicateConfig::default(),
            today: None,
            temp_dir: None,
        }
    }

    pub fn with_registry(mut self, registry: BankParserRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_duplicate_config(mut self, config: DuplicateConfig) -> Self {
        self.duplicates = config;
        self
    }

    /// Pin the day used to reject future-dated rows.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Directory for uploaded bytes while they are parsed. Defaults to the
    /// system temp dir.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &BankParserRegistry {
        &self.registry
    }

    fn parse_options(&self, date_range: Option<DateRange>) -> ParseOptions {
        let options = ParseOptions::default().with_range(date_range);
        match self.today {
            Some(today) => options.with_today(today),
            None => options,
        }
    }

    /// Dry run: parse a file on disk without touching the store.
    pub fn parse_statement(
        &self,
        path: &Path,
        file_name: &str,
        date_range: Option<DateRange>,
        forced_key: Option<&str>,
    ) -> Result<ParseResult> {
        pipeline::parse_statement(&self.registry, path, file_name, &self.parse_options(date_range), forced_key)
    }

    pub fn upload(
        &self,
        file: &UploadedFile,
        account_id: &str,
        budget_id: &str,
        date_range: Option<DateRange>,
    ) -> Result<UploadSummary> {
        let file_type = FileType::from_file_name(&file.file_name)
            .ok_or_else(|| ExtratoError::UnsupportedFile(file.file_name.clone()))?;
        let ext = extension(&file.file_name).unwrap_or_default();

        // Removed when dropped, on every exit path.
        let suffix = format!(".{ext}");
        let mut builder = tempfile::Builder::new();
        builder.prefix("extrato-").suffix(&suffix);
        let mut temp = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        temp.write_all(&file.bytes)?;
        temp.flush()?;

        let checksum = hex::encode(Sha256::digest(&file.bytes));
        let mut session = ImportSession::start(&file.file_name, file_type, account_id, budget_id);
        session.checksum = Some(checksum.clone());
        self.store.create_session(&session)?;
        info!(session = %session.id, file = %file.file_name, "import session started");

        let parsed = match self.parse_statement(temp.path(), &file.file_name, date_range, None) {
            Ok(parsed) => parsed,
            Err(e) => {
                let message = e.to_string();
                self.fail(&session.id, &message)?;
                return Err(ExtratoError::NoTransactions {
                    session_id: session.id,
                    errors: vec![message],
                });
            }
        };

        if parsed.transactions.is_empty() {
            self.fail(&session.id, "No transactions found in file")?;
            return Err(ExtratoError::NoTransactions {
                session_id: session.id,
                errors: parsed.errors,
            });
        }

        let mut errors = parsed.errors;
        let previous = self.or_fail(&session.id, self.store.find_completed_by_checksum(account_id, &checksum))?;
        if let Some(previous) = previous {
            warn!(session = %session.id, previous = %previous.id, "file was already imported");
            errors.push(format!(
                "This file was already imported in session {} on {}",
                previous.id,
                previous.created_at.format("%d/%m/%Y")
            ));
        }

        let detector = DuplicateDetector::new(&self.store, self.duplicates);
        let checked = self.or_fail(&session.id, detector.process_batch(parsed.transactions, account_id))?;

        let duplicates_found = checked.iter().filter(|(_, d)| d.is_duplicate).count();
        let temps: Vec<TempTransaction> = checked
            .into_iter()
            .map(|(parsed, dup)| TempTransaction::stage(&session.id, parsed, dup))
            .collect();
        let total = temps.len();
        self.or_fail(&session.id, self.store.create_temp_transactions(&temps))?;

        let update = StatusUpdate::pending(total, parsed.bank_name.clone());
        let moved = self.or_fail(
            &session.id,
            self.store.update_session_status(&session.id, SessionStatus::Processing, &update),
        )?;
        if !moved {
            return Err(self.lost_transition(&session.id, SessionStatus::Pending));
        }
        info!(
            session = %session.id,
            total,
            duplicates = duplicates_found,
            bank = parsed.bank_name.as_deref().unwrap_or("generic"),
            "import session pending"
        );

        Ok(UploadSummary {
            session_id: session.id,
            total_transactions: total,
            duplicates_found,
            errors,
            bank_name: parsed.bank_name,
        })
    }

    fn fail(&self, session_id: &str, message: &str) -> Result<()> {
        warn!(session = %session_id, error = %message, "import session failed");
        self.store
            .update_session_status(session_id, SessionStatus::Processing, &StatusUpdate::error(message))?;
        Ok(())
    }

    /// Mark the session failed if a step after its creation errors.
    fn or_fail<T>(&self, session_id: &str, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                self.fail(session_id, &e.to_string())?;
                Err(e)
            }
        }
    }

    /// Error for a compare-and-set that lost to another writer.
    fn lost_transition(&self, session_id: &str, to: SessionStatus) -> ExtratoError {
        match self.store.find_session(session_id) {
            Ok(Some(current)) => ExtratoError::InvalidTransition {
                from: current.status,
                to,
            },
            Ok(None) => ExtratoError::SessionNotFound(session_id.to_string()),
            Err(e) => e,
        }
    }

    fn require_session(&self, session_id: &str) -> Result<ImportSession> {
        self.store
            .find_session(session_id)?
            .ok_or_else(|| ExtratoError::SessionNotFound(session_id.to_string()))
    }

    pub fn get_session_details(&self, session_id: &str) -> Result<SessionDetails> {
        let session = self.require_session(session_id)?;
        let transactions = self.store.find_temp_transactions(session_id)?;
        let available_categories = self.store.categories_for_budget(&session.budget_id)?;
        let summary = SessionSummary::of(&transactions);
        Ok(SessionDetails {
            session,
            transactions,
            available_categories,
            summary,
        })
    }

    pub fn list_sessions(&self, budget_id: Option<&str>) -> Result<Vec<ImportSession>> {
        self.store.list_sessions(budget_id)
    }

    pub fn classify_transaction(&self, temp_id: &str, category_id: &str) -> Result<TempTransaction> {
        let temp = self
            .store
            .find_temp_transaction(temp_id)?
            .ok_or_else(|| ExtratoError::TempTransactionNotFound(temp_id.to_string()))?;
        let session = self.require_session(&temp.session_id)?;
        if session.status != SessionStatus::Pending {
            return Err(ExtratoError::SessionNotPending(session.id));
        }
        if !self.store.category_belongs_to_budget(category_id, &session.budget_id)? {
            return Err(ExtratoError::CategoryNotInBudget {
                category_id: category_id.to_string(),
                budget_id: session.budget_id,
            });
        }
        self.store.update_temp_classification(temp_id, category_id)
    }

    /// Materialize classified rows as ledger transactions and complete the
    /// session. Duplicates are skipped unless `import_duplicates` is set.
    pub fn confirm_import(&self, session_id: &str, import_duplicates: bool) -> Result<ConfirmSummary> {
        let session = self.require_session(session_id)?;
        if session.status != SessionStatus::Pending {
            return Err(ExtratoError::SessionNotPending(session.id));
        }

        let now = Utc::now();
        let staged = self.store.find_temp_transactions(session_id)?;
        let discarded_unclassified = staged.iter().filter(|t| !t.is_classified).count();
        let transactions: Vec<Transaction> = staged
            .into_iter()
            .filter(|t| t.is_classified && (import_duplicates || !t.is_duplicate))
            .map(|t| Transaction {
                id: uuid::Uuid::new_v4().to_string(),
                account_id: session.account_id.clone(),
                budget_id: session.budget_id.clone(),
                category_id: t.category_id,
                description: t.description,
                amount: t.amount,
                kind: t.kind,
                date: t.date,
                import_session_id: Some(session.id.clone()),
                created_at: now,
            })
            .collect();

        if transactions.is_empty() {
            return Err(ExtratoError::NothingToImport);
        }

        if !self.store.complete_session(session_id, &transactions)? {
            return Err(self.lost_transition(session_id, SessionStatus::Completed));
        }
        info!(
            session = %session_id,
            imported = transactions.len(),
            discarded_unclassified,
            "import session completed"
        );

        Ok(ConfirmSummary {
            imported_count: transactions.len(),
            transaction_ids: transactions.into_iter().map(|t| t.id).collect(),
            discarded_unclassified,
        })
    }

    pub fn cancel_session(&self, session_id: &str) -> Result<()> {
        let session = self.require_session(session_id)?;
        if !session.status.can_transition_to(SessionStatus::Cancelled) {
            return Err(ExtratoError::InvalidTransition {
                from: session.status,
                to: SessionStatus::Cancelled,
            });
        }
        if !self.store.cancel_session(session_id, session.status)? {
            return Err(self.lost_transition(session_id, SessionStatus::Cancelled));
        }
        info!(session = %session_id, "import session cancelled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const STATEMENT: &str = "Data;Descrição;Valor\n\
        02/01/2024;PADARIA REAL;-10,00\n\
        05/01/2024;SALARIO;5.000,00\n\
        xx/01/2024;QUEBRADA;-1,00\n";

    fn service() -> ImportService<MemoryStore> {
        let store = MemoryStore::new();
        store.add_category(Category {
            id: "mercado".into(),
            budget_id: "budget".into(),
            name: "Mercado".into(),
            kind: TransactionType::Expense,
        });
        store.add_category(Category {
            id: "alheia".into(),
            budget_id: "other-budget".into(),
            name: "Alheia".into(),
            kind: TransactionType::Expense,
        });
        ImportService::new(store).with_today(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
    }

    fn upload(service: &ImportService<MemoryStore>, body: &str) -> Result<UploadSummary> {
        service.upload(&UploadedFile::new("banco.csv", body.as_bytes().to_vec()), "acc", "budget", None)
    }

    fn classify_all(service: &ImportService<MemoryStore>, session_id: &str) {
        for row in service.get_session_details(session_id).unwrap().transactions {
            service.classify_transaction(&row.id, "mercado").unwrap();
        }
    }

    #[test]
    fn test_upload_stages_pending_session() {
        let service = service();
        let summary = upload(&service, STATEMENT).unwrap();
        assert_eq!(summary.total_transactions, 2);
        assert_eq!(summary.duplicates_found, 0);
        assert_eq!(summary.errors.len(), 1);

        let details = service.get_session_details(&summary.session_id).unwrap();
        assert_eq!(details.session.status, SessionStatus::Pending);
        assert_eq!(details.session.total_transactions, 2);
        assert_eq!(details.transactions[0].description, "PADARIA REAL");
        assert_eq!(details.available_categories.len(), 1);
        assert_eq!(details.summary.income_total, Decimal::new(5000, 0));
        assert_eq!(details.summary.expense_total, Decimal::new(10, 0));
        assert_eq!(details.summary.unclassified, 2);
    }

    #[test]
    fn test_upload_without_transactions_marks_error() {
        let service = service();
        let err = upload(&service, "Data;Descrição;Valor\n02/01/2030;FUTURO;-10,00\n").unwrap_err();
        let ExtratoError::NoTransactions { session_id, errors } = err else {
            panic!("expected NoTransactions");
        };
        assert_eq!(errors.len(), 1);
        let session = service.get_session_details(&session_id).unwrap().session;
        assert_eq!(session.status, SessionStatus::Error);
        assert!(session.error_message.is_some());
    }

    #[test]
    fn test_upload_rejects_unknown_extension() {
        let service = service();
        let file = UploadedFile::new("notes.docx", b"hello".to_vec());
        assert!(matches!(
            service.upload(&file, "acc", "budget", None),
            Err(ExtratoError::UnsupportedFile(_))
        ));
        assert!(service.list_sessions(None).unwrap().is_empty());
    }

    #[test]
    fn test_confirm_before_classification_is_rejected() {
        let service = service();
        let summary = upload(&service, STATEMENT).unwrap();
        assert!(matches!(
            service.confirm_import(&summary.session_id, false),
            Err(ExtratoError::NothingToImport)
        ));
        let session = service.get_session_details(&summary.session_id).unwrap().session;
        assert_eq!(session.status, SessionStatus::Pending);
    }

    #[test]
    fn test_classify_checks_budget_and_status() {
        let service = service();
        let summary = upload(&service, STATEMENT).unwrap();
        let row = service.get_session_details(&summary.session_id).unwrap().transactions[0].clone();
        assert!(matches!(
            service.classify_transaction(&row.id, "alheia"),
            Err(ExtratoError::CategoryNotInBudget { .. })
        ));
        assert!(matches!(
            service.classify_transaction("missing", "mercado"),
            Err(ExtratoError::TempTransactionNotFound(_))
        ));
        let classified = service.classify_transaction(&row.id, "mercado").unwrap();
        assert!(classified.is_classified);
    }

    #[test]
    fn test_confirm_imports_classified_rows() {
        let service = service();
        let summary = upload(&service, STATEMENT).unwrap();
        classify_all(&service, &summary.session_id);

        let confirmed = service.confirm_import(&summary.session_id, false).unwrap();
        assert_eq!(confirmed.imported_count, 2);
        let details = service.get_session_details(&summary.session_id).unwrap();
        assert_eq!(details.session.status, SessionStatus::Completed);
        assert!(details.transactions.is_empty());
        assert_eq!(service.store().transactions().len(), 2);
        assert!(matches!(
            service.confirm_import(&summary.session_id, false),
            Err(ExtratoError::SessionNotPending(_))
        ));
    }

    #[test]
    fn test_reupload_flags_duplicates() {
        let service = service();
        let first = upload(&service, STATEMENT).unwrap();
        classify_all(&service, &first.session_id);
        service.confirm_import(&first.session_id, false).unwrap();

        let second = upload(&service, STATEMENT).unwrap();
        assert_eq!(second.duplicates_found, 2);
        assert!(second.errors.iter().any(|e| e.contains("already imported")));

        classify_all(&service, &second.session_id);
        assert!(matches!(
            service.confirm_import(&second.session_id, false),
            Err(ExtratoError::NothingToImport)
        ));
        let forced = service.confirm_import(&second.session_id, true).unwrap();
        assert_eq!(forced.imported_count, 2);
    }

    #[test]
    fn test_cancel_transitions() {
        let service = service();
        let summary = upload(&service, STATEMENT).unwrap();
        service.cancel_session(&summary.session_id).unwrap();
        let details = service.get_session_details(&summary.session_id).unwrap();
        assert_eq!(details.session.status, SessionStatus::Cancelled);
        assert!(details.transactions.is_empty());
        assert!(matches!(
            service.cancel_session(&summary.session_id),
            Err(ExtratoError::InvalidTransition { .. })
        ));

        let done = upload(&service, STATEMENT).unwrap();
        classify_all(&service, &done.session_id);
        service.confirm_import(&done.session_id, false).unwrap();
        assert!(matches!(
            service.cancel_session(&done.session_id),
            Err(ExtratoError::InvalidTransition {
                from: SessionStatus::Completed,
                ..
            })
        ));
        assert!(matches!(
            service.cancel_session("missing"),
            Err(ExtratoError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_confirm_reports_discarded_unclassified_rows() {
        let service = service();
        let summary = upload(&service, STATEMENT).unwrap();
        let rows = service.get_session_details(&summary.session_id).unwrap().transactions;
        service.classify_transaction(&rows[0].id, "mercado").unwrap();

        let confirmed = service.confirm_import(&summary.session_id, false).unwrap();
        assert_eq!(confirmed.imported_count, 1);
        assert_eq!(confirmed.discarded_unclassified, 1);
        assert_eq!(service.store().transactions().len(), 1);
    }

    /// Delegates to [`MemoryStore`] but cannot stage rows.
    struct DiskFullStore(MemoryStore);

    impl ImportStore for DiskFullStore {
        fn create_session(&self, session: &ImportSession) -> Result<()> {
            self.0.create_session(session)
        }
        fn find_session(&self, id: &str) -> Result<Option<ImportSession>> {
            self.0.find_session(id)
        }
        fn list_sessions(&self, budget_id: Option<&str>) -> Result<Vec<ImportSession>> {
            self.0.list_sessions(budget_id)
        }
        fn find_completed_by_checksum(&self, account_id: &str, checksum: &str) -> Result<Option<ImportSession>> {
            self.0.find_completed_by_checksum(account_id, checksum)
        }
        fn update_session_status(&self, id: &str, from: SessionStatus, update: &StatusUpdate) -> Result<bool> {
            self.0.update_session_status(id, from, update)
        }
        fn create_temp_transactions(&self, _rows: &[TempTransaction]) -> Result<()> {
            Err(ExtratoError::Other("disk full".into()))
        }
        fn find_temp_transactions(&self, session_id: &str) -> Result<Vec<TempTransaction>> {
            self.0.find_temp_transactions(session_id)
        }
        fn find_temp_transaction(&self, id: &str) -> Result<Option<TempTransaction>> {
            self.0.find_temp_transaction(id)
        }
        fn update_temp_classification(&self, id: &str, category_id: &str) -> Result<TempTransaction> {
            self.0.update_temp_classification(id, category_id)
        }
        fn complete_session(&self, session_id: &str, transactions: &[Transaction]) -> Result<bool> {
            self.0.complete_session(session_id, transactions)
        }
        fn cancel_session(&self, id: &str, from: SessionStatus) -> Result<bool> {
            self.0.cancel_session(id, from)
        }
        fn find_existing_transactions(&self, account_id: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<Transaction>> {
            self.0.find_existing_transactions(account_id, from, to)
        }
        fn category_belongs_to_budget(&self, category_id: &str, budget_id: &str) -> Result<bool> {
            self.0.category_belongs_to_budget(category_id, budget_id)
        }
        fn categories_for_budget(&self, budget_id: &str) -> Result<Vec<Category>> {
            self.0.categories_for_budget(budget_id)
        }
    }

    #[test]
    fn test_store_failure_after_parse_marks_error() {
        let service = ImportService::new(DiskFullStore(MemoryStore::new()))
            .with_today(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        let file = UploadedFile::new("banco.csv", STATEMENT.as_bytes().to_vec());
        let err = service.upload(&file, "acc", "budget", None).unwrap_err();
        assert!(err.to_string().contains("disk full"));

        let sessions = service.list_sessions(None).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].status, SessionStatus::Error);
        assert!(sessions[0].error_message.as_deref().unwrap_or_default().contains("disk full"));
    }

    fn leftover_uploads(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .filter(|name| name.starts_with("extrato-"))
            .collect()
    }

    #[test]
    fn test_upload_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let service = service().with_temp_dir(dir.path());

        upload(&service, STATEMENT).unwrap();
        assert!(leftover_uploads(dir.path()).is_empty());

        let future = "Data;Descrição;Valor\n02/01/2030;FUTURO;-10,00\n";
        assert!(matches!(upload(&service, future), Err(ExtratoError::NoTransactions { .. })));
        assert!(leftover_uploads(dir.path()).is_empty());

        let broken = UploadedFile::new("broken.xlsx", b"not a workbook".to_vec());
        assert!(matches!(
            service.upload(&broken, "acc", "budget", None),
            Err(ExtratoError::NoTransactions { .. })
        ));
        assert!(leftover_uploads(dir.path()).is_empty());
        assert_eq!(service.list_sessions(None).unwrap().len(), 3);
    }

    #[test]
    fn test_store_failure_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let service = ImportService::new(DiskFullStore(MemoryStore::new()))
            .with_today(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
            .with_temp_dir(dir.path());
        let file = UploadedFile::new("banco.csv", STATEMENT.as_bytes().to_vec());
        assert!(service.upload(&file, "acc", "budget", None).is_err());
        assert!(leftover_uploads(dir.path()).is_empty());
    }
}
