use assert_cmd::Command;
use predicates::prelude::*;

fn extrato(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("extrato").unwrap();
    cmd.env("HOME", home).env_remove("RUST_LOG");
    cmd
}

#[test]
fn formats_lists_registry_order() {
    let home = tempfile::tempdir().unwrap();
    extrato(home.path())
        .arg("formats")
        .assert()
        .success()
        .stdout(predicate::str::contains("nubank-card"))
        .stdout(predicate::str::contains("clear"));
}

#[test]
fn parse_prints_transactions_as_json() {
    let home = tempfile::tempdir().unwrap();
    let file = home.path().join("banco.csv");
    std::fs::write(&file, "Data;Descrição;Valor\n02/01/2024;PADARIA REAL;-10,00\n").unwrap();
    extrato(home.path())
        .args(["parse", file.to_str().unwrap(), "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PADARIA REAL"))
        .stdout(predicate::str::contains("\"EXPENSE\""));
}

#[test]
fn import_requires_init() {
    let home = tempfile::tempdir().unwrap();
    let file = home.path().join("banco.csv");
    std::fs::write(&file, "Data;Descrição;Valor\n02/01/2024;PADARIA REAL;-10,00\n").unwrap();
    extrato(home.path())
        .args(["import", file.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("extrato init"));
}

#[test]
fn init_then_import_and_list_sessions() {
    let home = tempfile::tempdir().unwrap();
    let data = home.path().join("data");
    extrato(home.path())
        .args(["init", "--data-dir", data.to_str().unwrap()])
        .assert()
        .success();
    assert!(data.join("extrato.db").exists());

    let file = home.path().join("banco.csv");
    std::fs::write(&file, "Data;Descrição;Valor\n02/01/2024;PADARIA REAL;-10,00\n").unwrap();
    extrato(home.path())
        .args(["import", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 transactions staged"));

    extrato(home.path())
        .arg("sessions")
        .assert()
        .success()
        .stdout(predicate::str::contains("banco.csv"));
}

#[test]
fn unsupported_file_exits_with_error() {
    let home = tempfile::tempdir().unwrap();
    let file = home.path().join("notes.docx");
    std::fs::write(&file, "hello").unwrap();
    extrato(home.path())
        .args(["parse", file.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Error: Unsupported file"));
}
