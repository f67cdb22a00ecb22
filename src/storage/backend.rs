//! Persistence backend trait and backend selection.
//!
//! A backend mirrors the in-memory store to some external "sheet" per
//! record type:
//! - `FileBackend` - JSONL files in the data directory (default)
//! - `SheetsBackend` - Google Sheets + Drive
//! - `ProxyBackend` - HTTP endpoint speaking JSON
//! - `DisabledBackend` - persistence turned off

use crate::models::Row;
use crate::{Error, Result};

/// Trait for backends that mirror records and store uploaded files.
///
/// Every method may fail; callers treat failures as warnings and never roll
/// back local state.
pub trait PersistenceBackend: Send {
    /// Append rows to a sheet, writing `header` first when the sheet is empty.
    fn append_rows(&mut self, sheet: &str, header: &[&str], rows: &[Vec<String>]) -> Result<()>;

    /// Replace the whole content of a sheet.
    fn replace_rows(&mut self, sheet: &str, header: &[&str], rows: &[Vec<String>]) -> Result<()>;

    /// Read every row of a sheet as a header-keyed map.
    fn load_rows(&mut self, sheet: &str) -> Result<Vec<Row>>;

    /// Store file bytes under an owner folder and return a link to them.
    fn upload_file(&mut self, bytes: &[u8], filename: &str, owner: &str) -> Result<String>;

    /// Where the data goes (for display purposes).
    fn location(&self) -> String;

    /// Get the backend type.
    fn backend_type(&self) -> BackendType;

    /// Whether writes are attempted at all.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Available backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// JSONL files under the data directory (default)
    File,
    /// Google Sheets API with a service account
    Sheets,
    /// HTTP proxy endpoint
    Proxy,
    /// Persistence turned off
    Disabled,
}

impl BackendType {
    /// Parse a backend type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "file" | "local" | "default" => Some(Self::File),
            "sheets" | "google" | "gsheets" => Some(Self::Sheets),
            "proxy" | "http" => Some(Self::Proxy),
            "none" | "off" | "disabled" => Some(Self::Disabled),
            _ => None,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Sheets => "sheets",
            Self::Proxy => "proxy",
            Self::Disabled => "none",
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BackendType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| {
            Error::InvalidInput(format!(
                "unknown backend '{}' (expected file, sheets, proxy or none)",
                s
            ))
        })
    }
}

/// Backend used when persistence is off or misconfigured.
#[derive(Debug, Clone)]
pub struct DisabledBackend {
    reason: String,
}

impl DisabledBackend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    fn refuse<T>(&self) -> Result<T> {
        Err(Error::PersistenceDisabled(self.reason.clone()))
    }
}

impl PersistenceBackend for DisabledBackend {
    fn append_rows(&mut self, _sheet: &str, _header: &[&str], _rows: &[Vec<String>]) -> Result<()> {
        self.refuse()
    }

    fn replace_rows(&mut self, _sheet: &str, _header: &[&str], _rows: &[Vec<String>]) -> Result<()> {
        self.refuse()
    }

    fn load_rows(&mut self, _sheet: &str) -> Result<Vec<Row>> {
        self.refuse()
    }

    fn upload_file(&mut self, _bytes: &[u8], _filename: &str, _owner: &str) -> Result<String> {
        self.refuse()
    }

    fn location(&self) -> String {
        format!("disabled ({})", self.reason)
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Disabled
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Zip a header with each row of cells into header-keyed maps.
pub fn rows_to_maps(header: &[String], rows: &[Vec<String>]) -> Vec<Row> {
    rows.iter()
        .filter(|cells| cells.iter().any(|c| !c.trim().is_empty()))
        .map(|cells| {
            header
                .iter()
                .enumerate()
                .filter(|(_, h)| !h.trim().is_empty())
                .map(|(i, h)| (h.trim().to_string(), cells.get(i).cloned().unwrap_or_default()))
                .collect()
        })
        .collect()
}
