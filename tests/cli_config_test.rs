//! Integration tests for configuration, backends, sync and the action log.

mod common;

use common::TestEnv;
use predicates::prelude::*;
use std::fs;

fn read_action_log(env: &TestEnv) -> String {
    fs::read_to_string(env.data_path().join("action.log")).unwrap_or_default()
}

#[test]
fn test_config_set_show_unset() {
    let env = TestEnv::new();
    env.docket()
        .args(["config", "set", "spreadsheet", "Escritorio_Dados"])
        .assert()
        .success();
    assert!(env.data_path().join("config.kdl").exists());

    env.docket()
        .args(["-H", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Escritorio_Dados"));

    let unset = env.json(&["config", "unset", "spreadsheet"]);
    assert_eq!(unset["changed"], true);

    env.docket()
        .args(["-H", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PlataformaAD_Dados"));
}

#[test]
fn test_config_rejects_unknown_key_and_bad_values() {
    let env = TestEnv::new();
    env.docket()
        .args(["config", "set", "colour", "blue"])
        .assert()
        .failure();
    env.docket()
        .args(["config", "set", "proxy-url", "ftp://x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("proxy-url"));
    env.docket()
        .args(["config", "set", "backend", "cloud"])
        .assert()
        .failure();
}

#[test]
fn test_env_overrides_session_config() {
    let env = TestEnv::new();
    env.docket()
        .args(["config", "set", "spreadsheet", "From_Config"])
        .assert()
        .success();
    env.docket()
        .env("GOOGLE_SHEETS_FILE", "From_Env")
        .args(["-H", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("From_Env"))
        .stdout(predicate::str::contains("From_Config").not());
}

#[test]
fn test_disabled_backend_warns_and_keeps_nothing() {
    let env = TestEnv::new();
    env.docket()
        .args(["--backend", "none", "client", "add", "--name", "Ana"])
        .assert()
        .success()
        .stderr(predicate::str::contains("warning: changes are not persisted"));

    // nothing was written, so the next run starts empty
    let list = env.json(&["client", "list"]);
    assert_eq!(list["total"], 0);
}

#[test]
fn test_sheets_backend_without_credentials_degrades() {
    let env = TestEnv::new();
    env.docket()
        .args(["--backend", "sheets", "client", "add", "--name", "Ana"])
        .assert()
        .success()
        .stderr(predicate::str::contains("persistence disabled"));
}

#[test]
fn test_sync_with_empty_outbox() {
    let env = TestEnv::new();
    let result = env.json(&["sync"]);
    assert_eq!(result["sent"], 0);
    assert_eq!(result["remaining"], 0);
}

#[test]
fn test_action_log_records_commands() {
    let env = TestEnv::new();
    env.docket()
        .args(["client", "add", "--name", "Ana"])
        .assert()
        .success();
    env.docket().args(["client", "rm", "7"]).assert().failure();

    let log = read_action_log(&env);
    let entries: Vec<serde_json::Value> = log
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["command"], "client add");
    assert_eq!(entries[0]["success"], true);
    assert_eq!(entries[1]["command"], "client rm");
    assert_eq!(entries[1]["success"], false);
}

#[test]
fn test_action_log_can_be_disabled() {
    let env = TestEnv::new();
    env.docket()
        .args(["config", "set", "action-log", "false"])
        .assert()
        .success();
    env.docket().args(["overview"]).assert().success();
    assert!(!read_action_log(&env).contains("overview"));
}

#[test]
fn test_version_shows_build_info() {
    let env = TestEnv::new();
    env.docket()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("docket"));
}
