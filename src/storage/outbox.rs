//! Queue of mirror writes that failed and await retry.
//!
//! Writes are flushed strictly in order; a flush stops at the first failure
//! so a later `replace` never overtakes an earlier `append` for the same
//! sheet. When a path is set the queue is saved after every change.

use super::backend::PersistenceBackend;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Kind of mirror write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingOp {
    Append,
    Replace,
}

/// One queued mirror write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingWrite {
    pub op: PendingOp,
    pub sheet: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub queued_at: DateTime<Utc>,
}

impl PendingWrite {
    pub fn new(op: PendingOp, sheet: &str, header: &[&str], rows: Vec<Vec<String>>) -> Self {
        Self {
            op,
            sheet: sheet.to_string(),
            header: header.iter().map(|h| h.to_string()).collect(),
            rows,
            attempts: 0,
            last_error: None,
            queued_at: Utc::now(),
        }
    }

    fn send(&self, backend: &mut dyn PersistenceBackend) -> Result<()> {
        let header: Vec<&str> = self.header.iter().map(String::as_str).collect();
        match self.op {
            PendingOp::Append => backend.append_rows(&self.sheet, &header, &self.rows),
            PendingOp::Replace => backend.replace_rows(&self.sheet, &header, &self.rows),
        }
    }
}

/// Outcome of one flush.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub sent: usize,
    pub remaining: usize,
    pub error: Option<String>,
}

/// Ordered queue of failed writes.
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    entries: Vec<PendingWrite>,
    path: Option<PathBuf>,
}

impl Outbox {
    /// An outbox that lives only in memory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the outbox saved at `path`, or start empty when there is none.
    pub fn open(path: &Path) -> Result<Self> {
        let entries = if path.exists() {
            let content = fs::read_to_string(path)?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            Vec::new()
        };
        Ok(Self {
            entries,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PendingWrite] {
        &self.entries
    }

    /// Queue a write that just failed with `error`.
    pub fn push(&mut self, mut write: PendingWrite, error: &str) -> Result<()> {
        write.attempts += 1;
        write.last_error = Some(error.to_string());
        self.entries.push(write);
        self.save()
    }

    /// Send queued writes in order, stopping at the first failure.
    pub fn flush(&mut self, backend: &mut dyn PersistenceBackend) -> FlushReport {
        let mut report = FlushReport::default();
        if self.entries.is_empty() || !backend.is_enabled() {
            report.remaining = self.entries.len();
            return report;
        }

        while let Some(write) = self.entries.first_mut() {
            match write.send(backend) {
                Ok(()) => {
                    debug!(sheet = %write.sheet, op = ?write.op, "flushed pending write");
                    self.entries.remove(0);
                    report.sent += 1;
                }
                Err(e) => {
                    write.attempts += 1;
                    write.last_error = Some(e.to_string());
                    report.error = Some(e.to_string());
                    break;
                }
            }
        }
        report.remaining = self.entries.len();

        if let Err(e) = self.save() {
            warn!(error = %e, "failed to save outbox");
        }
        report
    }

    /// The latest pending full rewrite of `sheet`, if any.
    pub fn pending_replace(&self, sheet: &str) -> Option<&PendingWrite> {
        self.entries
            .iter()
            .rev()
            .find(|w| w.op == PendingOp::Replace && w.sheet == sheet)
    }

    /// Pending appends for `sheet` queued after its latest pending replace.
    pub fn pending_appends(&self, sheet: &str) -> Vec<&PendingWrite> {
        let start = self
            .entries
            .iter()
            .rposition(|w| w.op == PendingOp::Replace && w.sheet == sheet)
            .map(|i| i + 1)
            .unwrap_or(0);
        self.entries[start..]
            .iter()
            .filter(|w| w.op == PendingOp::Append && w.sheet == sheet)
            .collect()
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if self.entries.is_empty() {
            if path.exists() {
                fs::remove_file(path)?;
            }
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&self.entries)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Row;
    use crate::storage::backend::BackendType;
    use crate::Error;
    use tempfile::TempDir;

    /// Records every write; fails while `down` is set.
    #[derive(Default)]
    struct FlakyBackend {
        down: bool,
        writes: Vec<(PendingOp, String, usize)>,
    }

    impl PersistenceBackend for FlakyBackend {
        fn append_rows(&mut self, sheet: &str, _header: &[&str], rows: &[Vec<String>]) -> Result<()> {
            if self.down {
                return Err(Error::Other("offline".into()));
            }
            self.writes.push((PendingOp::Append, sheet.to_string(), rows.len()));
            Ok(())
        }

        fn replace_rows(&mut self, sheet: &str, _header: &[&str], rows: &[Vec<String>]) -> Result<()> {
            if self.down {
                return Err(Error::Other("offline".into()));
            }
            self.writes.push((PendingOp::Replace, sheet.to_string(), rows.len()));
            Ok(())
        }

        fn load_rows(&mut self, _sheet: &str) -> Result<Vec<Row>> {
            Ok(Vec::new())
        }

        fn upload_file(&mut self, _bytes: &[u8], _filename: &str, _owner: &str) -> Result<String> {
            Ok(String::new())
        }

        fn location(&self) -> String {
            "flaky".into()
        }

        fn backend_type(&self) -> BackendType {
            BackendType::File
        }
    }

    fn append(sheet: &str, id: &str) -> PendingWrite {
        PendingWrite::new(PendingOp::Append, sheet, &["ID"], vec![vec![id.to_string()]])
    }

    #[test]
    fn test_flush_sends_in_order_and_empties() {
        let mut outbox = Outbox::in_memory();
        outbox.push(append("Clientes", "cli-1"), "offline").unwrap();
        outbox
            .push(PendingWrite::new(PendingOp::Replace, "Casos", &["ID"], vec![]), "offline")
            .unwrap();

        let mut backend = FlakyBackend::default();
        let report = outbox.flush(&mut backend);

        assert_eq!(report.sent, 2);
        assert_eq!(report.remaining, 0);
        assert!(outbox.is_empty());
        assert_eq!(backend.writes[0].0, PendingOp::Append);
        assert_eq!(backend.writes[1].1, "Casos");
    }

    #[test]
    fn test_flush_stops_at_first_failure() {
        let mut outbox = Outbox::in_memory();
        outbox.push(append("Clientes", "cli-1"), "offline").unwrap();
        outbox.push(append("Clientes", "cli-2"), "offline").unwrap();

        let mut backend = FlakyBackend {
            down: true,
            ..Default::default()
        };
        let report = outbox.flush(&mut backend);

        assert_eq!(report.sent, 0);
        assert_eq!(report.remaining, 2);
        assert_eq!(outbox.entries()[0].attempts, 2);
        assert_eq!(outbox.entries()[1].attempts, 1);
        assert!(report.error.unwrap().contains("offline"));
    }

    #[test]
    fn test_outbox_persists_between_opens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("outbox.json");

        let mut outbox = Outbox::open(&path).unwrap();
        outbox.push(append("Tarefas", "tsk-1"), "timeout").unwrap();
        assert!(path.exists());

        let mut reopened = Outbox::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.entries()[0].last_error.as_deref(), Some("timeout"));

        reopened.flush(&mut FlakyBackend::default());
        assert!(!path.exists());
    }

    #[test]
    fn test_pending_appends_after_latest_replace() {
        let mut outbox = Outbox::in_memory();
        outbox.push(append("Clientes", "cli-1"), "x").unwrap();
        outbox
            .push(PendingWrite::new(PendingOp::Replace, "Clientes", &["ID"], vec![]), "x")
            .unwrap();
        outbox.push(append("Clientes", "cli-3"), "x").unwrap();
        outbox.push(append("Casos", "cas-1"), "x").unwrap();

        assert!(outbox.pending_replace("Clientes").is_some());
        assert!(outbox.pending_replace("Casos").is_none());
        let appends = outbox.pending_appends("Clientes");
        assert_eq!(appends.len(), 1);
        assert_eq!(appends[0].rows[0][0], "cli-3");
    }
}
