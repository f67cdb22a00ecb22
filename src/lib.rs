//! Docket - case management for small legal practices.
//!
//! This library provides the core functionality for the `docket` CLI and web
//! app: record storage, filtering, edit sessions, summaries, best-effort
//! mirroring to a persistence backend, and XLSX/PDF export.

pub mod action_log;
pub mod cli;
pub mod commands;
pub mod config;
pub mod export;
#[cfg(feature = "gui")]
pub mod gui;
pub mod models;
pub mod session;
pub mod storage;

/// Test utilities for isolated test environments.
#[cfg(test)]
pub(crate) mod test_utils {
    use std::path::Path;
    use tempfile::TempDir;

    use crate::session::Session;
    use crate::storage::{FileBackend, Outbox};

    /// Test environment with an isolated data directory.
    pub struct TestEnv {
        pub data_dir: TempDir,
    }

    impl TestEnv {
        pub fn new() -> Self {
            Self {
                data_dir: TempDir::new().unwrap(),
            }
        }

        pub fn data_path(&self) -> &Path {
            self.data_dir.path()
        }

        /// A session backed by JSONL files in this environment.
        pub fn file_session(&self) -> Session {
            let outbox = Outbox::open(&self.data_path().join("outbox.json")).unwrap();
            Session::with_outbox(Box::new(FileBackend::new(self.data_path())), outbox)
        }
    }

    impl Default for TestEnv {
        fn default() -> Self {
            Self::new()
        }
    }
}

/// Library-level error type for docket operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{backend} backend error: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("no record at index {0}")]
    StaleIndex(usize),

    #[error("persistence disabled: {0}")]
    PersistenceDisabled(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for docket operations.
pub type Result<T> = std::result::Result<T, Error>;
