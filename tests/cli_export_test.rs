//! Integration tests for `docket export`.

mod common;

use common::TestEnv;
use predicates::prelude::*;
use std::fs;

fn seed(env: &TestEnv) {
    for name in ["Ana", "Bia", "Caio"] {
        env.docket()
            .args(["client", "add", "--name", name, "--email", "x@y.com"])
            .assert()
            .success();
    }
}

#[test]
fn test_export_xlsx_to_default_path() {
    let env = TestEnv::new();
    seed(&env);

    let result = env.json(&["export", "clients"]);
    assert_eq!(result["format"], "xlsx");
    assert_eq!(result["rows"], 3);

    let bytes = fs::read(env.work_path().join("clientes.xlsx")).unwrap();
    // XLSX is a zip archive
    assert_eq!(&bytes[..2], b"PK");
}

#[test]
fn test_export_pdf_to_output_path() {
    let env = TestEnv::new();
    seed(&env);
    let out = env.work_path().join("relatorios").join("clientes.pdf");

    env.docket()
        .args(["-H", "export", "clientes", "--format", "pdf", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 3 clients"));

    let bytes = fs::read(&out).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
    assert!(bytes.ends_with(b"%%EOF\n"));
}

#[test]
fn test_export_empty_collection() {
    let env = TestEnv::new();
    let result = env.json(&["export", "transactions", "-f", "pdf"]);
    assert_eq!(result["rows"], 0);
    assert!(env.work_path().join("financeiro.pdf").exists());
}

#[test]
fn test_export_rejects_unknown_names() {
    let env = TestEnv::new();
    env.docket().args(["export", "planets"]).assert().failure();
    env.docket()
        .args(["export", "clients", "--format", "csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown export format"));
}
