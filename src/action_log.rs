//! Action logging for docket commands.
//!
//! Every CLI command is appended to `<data-dir>/action.log` as one JSON
//! object per line. Logging never fails a command: problems are reported as
//! tracing warnings and otherwise ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Longest string kept verbatim in logged arguments.
const MAX_STRING_CHARS: usize = 100;

/// Longest array kept verbatim in logged arguments.
const MAX_ARRAY_ITEMS: usize = 10;

/// Represents a single action log entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionLog {
    /// ISO 8601 timestamp when the action occurred
    pub timestamp: DateTime<Utc>,

    /// Command name (e.g., "client add", "overview", "export")
    pub command: String,

    /// Command arguments as JSON
    pub args: serde_json::Value,

    /// Whether the command succeeded
    pub success: bool,

    /// Error message if the command failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Command execution duration in milliseconds
    pub duration_ms: u64,

    /// User who executed the command
    pub user: String,
}

/// Location of the action log inside a data directory.
pub fn log_path(data_dir: &Path) -> PathBuf {
    data_dir.join("action.log")
}

/// Log an action to `<data-dir>/action.log`.
pub fn log_action(
    data_dir: &Path,
    command: &str,
    args: serde_json::Value,
    success: bool,
    error: Option<String>,
    duration_ms: u64,
) {
    let entry = ActionLog {
        timestamp: Utc::now(),
        command: command.to_string(),
        args: sanitize_args(&args),
        success,
        error,
        duration_ms,
        user: get_current_user(),
    };

    if let Err(e) = write_log_entry(&log_path(data_dir), &entry) {
        warn!(error = %e, "failed to write action log");
    }
}

/// Write a log entry to the log file.
fn write_log_entry(path: &Path, entry: &ActionLog) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", json)
}

fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_lowercase();
    ["password", "token", "key", "secret", "creds", "credential"]
        .iter()
        .any(|word| key.contains(word))
}

fn looks_like_path(s: &str) -> bool {
    s.starts_with('/')
        || s.starts_with("~/")
        || s.starts_with("./")
        || s.starts_with("../")
        || s.contains('\\')
}

/// Sanitize arguments to remove sensitive data.
fn sanitize_args(args: &serde_json::Value) -> serde_json::Value {
    match args {
        serde_json::Value::Object(map) => {
            let sanitized = map
                .iter()
                .map(|(key, value)| {
                    let value = if is_sensitive_key(key) && !value.is_null() {
                        serde_json::Value::String("[REDACTED]".to_string())
                    } else {
                        sanitize_args(value)
                    };
                    (key.clone(), value)
                })
                .collect();
            serde_json::Value::Object(sanitized)
        }
        serde_json::Value::Array(arr) => {
            if arr.len() > MAX_ARRAY_ITEMS {
                serde_json::Value::String(format!("[Array with {} items]", arr.len()))
            } else {
                serde_json::Value::Array(arr.iter().map(sanitize_args).collect())
            }
        }
        serde_json::Value::String(s) => {
            let sanitized = if looks_like_path(s) {
                s.rsplit(['/', '\\']).next().unwrap_or(s).to_string()
            } else {
                s.clone()
            };

            let length = sanitized.chars().count();
            if length > MAX_STRING_CHARS {
                let head: String = sanitized.chars().take(MAX_STRING_CHARS - 3).collect();
                serde_json::Value::String(format!("{}... ({} chars)", head, length))
            } else {
                serde_json::Value::String(sanitized)
            }
        }
        _ => args.clone(),
    }
}

/// Get the current user's username.
fn get_current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_simple_string() {
        let value = serde_json::json!("Ana Souza");
        assert_eq!(sanitize_args(&value), serde_json::json!("Ana Souza"));
    }

    #[test]
    fn test_sanitize_file_path() {
        let value = serde_json::json!("/home/ana/relatorios/casos.xlsx");
        assert_eq!(sanitize_args(&value), serde_json::json!("casos.xlsx"));
    }

    #[test]
    fn test_sanitize_windows_path() {
        let value = serde_json::json!("C:\\Users\\ana\\casos.pdf");
        assert_eq!(sanitize_args(&value), serde_json::json!("casos.pdf"));
    }

    #[test]
    fn test_dates_are_not_paths() {
        let value = serde_json::json!("31/01/2024");
        assert_eq!(sanitize_args(&value), serde_json::json!("31/01/2024"));
    }

    #[test]
    fn test_sanitize_long_multibyte_string() {
        let long_str = "ã".repeat(150);
        let sanitized = sanitize_args(&serde_json::json!(long_str));
        let s = sanitized.as_str().unwrap();
        assert!(s.ends_with("... (150 chars)"));
        assert!(s.starts_with("ããã"));
    }

    #[test]
    fn test_sanitize_sensitive_keys() {
        let value = serde_json::json!({
            "name": "Ana",
            "proxy_token": "abc123",
            "creds": "{...}",
            "api_key": null,
        });
        let sanitized = sanitize_args(&value);

        assert_eq!(sanitized["name"], "Ana");
        assert_eq!(sanitized["proxy_token"], "[REDACTED]");
        assert_eq!(sanitized["creds"], "[REDACTED]");
        assert!(sanitized["api_key"].is_null());
    }

    #[test]
    fn test_sanitize_large_array() {
        let arr: Vec<i32> = (0..15).collect();
        let sanitized = sanitize_args(&serde_json::json!(arr));
        assert_eq!(sanitized, serde_json::json!("[Array with 15 items]"));
    }

    #[test]
    fn test_sanitize_nested_object() {
        let value = serde_json::json!({
            "fields": {"name": "Ana", "secret": "x"},
            "output": "/tmp/out/clientes.pdf"
        });
        let sanitized = sanitize_args(&value);

        assert_eq!(sanitized["fields"]["name"], "Ana");
        assert_eq!(sanitized["fields"]["secret"], "[REDACTED]");
        assert_eq!(sanitized["output"], "clientes.pdf");
    }

    #[test]
    fn test_log_action_appends_lines() {
        let dir = TempDir::new().unwrap();
        log_action(dir.path(), "client add", serde_json::json!({"name": "Ana"}), true, None, 3);
        log_action(
            dir.path(),
            "client rm",
            serde_json::json!({"index": 9}),
            false,
            Some("no record at index 9".to_string()),
            1,
        );

        let content = fs::read_to_string(log_path(dir.path())).unwrap();
        let entries: Vec<ActionLog> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].command, "client add");
        assert!(entries[0].success);
        assert_eq!(entries[1].error.as_deref(), Some("no record at index 9"));
    }
}
