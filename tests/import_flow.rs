use chrono::NaiveDate;
use extrato::db::{DEFAULT_ACCOUNT, DEFAULT_BUDGET};
use extrato::models::SessionStatus;
use extrato::store::{ImportStore, SqliteStore};
use extrato::{ExtratoError, ImportService, UploadedFile};

const NUBANK_CARD: &str = "date,title,amount\n\
2024-03-01,Padaria Real,12.50\n\
2024-03-02,Uber *Trip,23.45\n\
2024-03-05,Pagamento recebido,-500.00\n";

fn service(dir: &tempfile::TempDir) -> ImportService<SqliteStore> {
    let store = SqliteStore::open(&dir.path().join("extrato.db")).unwrap();
    ImportService::new(store).with_today(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
}

fn upload(service: &ImportService<SqliteStore>) -> String {
    let file = UploadedFile::new("Nubank_2024-03.csv", NUBANK_CARD.as_bytes().to_vec());
    let summary = service.upload(&file, DEFAULT_ACCOUNT, DEFAULT_BUDGET, None).unwrap();
    assert_eq!(summary.bank_name.as_deref(), Some("Nubank"));
    assert_eq!(summary.total_transactions, 3);
    summary.session_id
}

#[test]
fn upload_classify_confirm() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(&dir);
    let session_id = upload(&service);

    let details = service.get_session_details(&session_id).unwrap();
    assert_eq!(details.session.status, SessionStatus::Pending);
    assert!(details.available_categories.iter().any(|c| c.id == "alimentacao"));
    assert_eq!(details.summary.income_total.to_string(), "500.00");

    for tx in &details.transactions {
        let category = if tx.description == "Pagamento recebido" { "outras-receitas" } else { "alimentacao" };
        service.classify_transaction(&tx.id, category).unwrap();
    }
    let confirmed = service.confirm_import(&session_id, false).unwrap();
    assert_eq!(confirmed.imported_count, 3);
    assert_eq!(confirmed.discarded_unclassified, 0);

    let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let ledger = service
        .store()
        .find_existing_transactions(DEFAULT_ACCOUNT, day, day + chrono::Duration::days(10))
        .unwrap();
    assert_eq!(ledger.len(), 3);
    assert!(ledger.iter().all(|t| t.import_session_id.as_deref() == Some(session_id.as_str())));

    let again = service
        .upload(
            &UploadedFile::new("Nubank_2024-03.csv", NUBANK_CARD.as_bytes().to_vec()),
            DEFAULT_ACCOUNT,
            DEFAULT_BUDGET,
            None,
        )
        .unwrap();
    assert_eq!(again.duplicates_found, 3);
}

#[test]
fn confirm_before_classification_keeps_session_pending() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(&dir);
    let session_id = upload(&service);

    assert!(matches!(
        service.confirm_import(&session_id, false),
        Err(ExtratoError::NothingToImport)
    ));
    assert_eq!(
        service.get_session_details(&session_id).unwrap().session.status,
        SessionStatus::Pending
    );
}

#[test]
fn cancel_pending_then_reject_second_cancel() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(&dir);
    let session_id = upload(&service);

    service.cancel_session(&session_id).unwrap();
    let details = service.get_session_details(&session_id).unwrap();
    assert_eq!(details.session.status, SessionStatus::Cancelled);
    assert!(details.transactions.is_empty());
    assert!(matches!(
        service.cancel_session(&session_id),
        Err(ExtratoError::InvalidTransition { .. })
    ));
    assert_eq!(service.list_sessions(Some(DEFAULT_BUDGET)).unwrap().len(), 1);
}
