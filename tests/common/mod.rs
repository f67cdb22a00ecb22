//! Common test utilities for docket integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/docket/` directory.

#![allow(dead_code)]

use assert_cmd::Command;
pub use tempfile::TempDir;

/// Environment variables that would leak the developer's own setup into a test.
const AMBIENT_VARS: &[&str] = &[
    "DOCKET_BACKEND",
    "DOCKET_PROXY_URL",
    "DOCKET_PROXY_TOKEN",
    "GOOGLE_CREDS",
    "GOOGLE_CREDS_JSON",
    "GOOGLE_SHEETS_FILE",
    "GOOGLE_DRIVE_ROOT",
    "DOCKET_LOG",
];

/// A test environment with isolated data storage.
///
/// Each `TestEnv` creates three temporary directories:
/// - `work_dir`: current directory of every command (exports land here)
/// - `data_dir`: records, outbox and logs (via `DOCKET_DATA_DIR`)
/// - `config_dir`: system config (via `DOCKET_CONFIG_DIR`)
///
/// The `docket()` method sets the variables per command, which keeps
/// tests parallel-safe.
pub struct TestEnv {
    pub work_dir: TempDir,
    pub data_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        Self {
            work_dir: TempDir::new().unwrap(),
            data_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the docket binary with isolated directories.
    pub fn docket(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_docket"));
        cmd.current_dir(self.work_dir.path());
        for var in AMBIENT_VARS {
            cmd.env_remove(var);
        }
        cmd.env("DOCKET_DATA_DIR", self.data_dir.path());
        cmd.env("DOCKET_CONFIG_DIR", self.config_dir.path());
        cmd
    }

    /// Run a command that must succeed and parse its JSON output.
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.docket().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "docket {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }

    /// Get the path to the working directory.
    pub fn work_path(&self) -> &std::path::Path {
        self.work_dir.path()
    }

    /// Get the path to the data directory.
    pub fn data_path(&self) -> &std::path::Path {
        self.data_dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
