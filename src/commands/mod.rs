//! Command implementations for the docket CLI.
//!
//! Every command returns a result struct implementing [`Output`], so the
//! binary can print it as JSON (default) or as text (`-H`). Record commands
//! live in [`records`]; this module holds the read-only views, export,
//! configuration and outbox commands.

pub mod records;

use crate::config::{DocketConfig, ResolvedConfig, ValueSource, session_config_path};
use crate::export::{self, ExportFormat, Table};
use crate::models::summary::{self, Overview, Report, Tally};
use crate::models::{Amount, Case, EntityKind, Event, Record};
use crate::session::Session;
use crate::{Error, Result};
use records::Indexed;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to a JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

pub(crate) fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
}

// === Overview ===

#[derive(Serialize)]
pub struct OverviewResult {
    #[serde(flatten)]
    pub overview: Overview,
    pub balance_display: String,
}

impl Output for OverviewResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let o = &self.overview;
        let mut lines = vec![
            format!("Clients: {}", o.clients),
            format!("Cases:   {}", o.cases),
            format!("Tasks:   {}", o.tasks),
            format!("Balance: {}", self.balance_display),
        ];
        if o.upcoming.is_empty() {
            lines.push("No upcoming events.".to_string());
        } else {
            lines.push("Upcoming events:".to_string());
            lines.extend(o.upcoming.iter().map(|e| format!("  {}", e.summary())));
        }
        lines.join("\n")
    }
}

/// Counts, balance and the next events.
pub fn overview(session: &Session) -> OverviewResult {
    let overview = Overview::compute(session.store());
    OverviewResult {
        balance_display: overview.balance.to_currency(),
        overview,
    }
}

// === Cases by client ===

#[derive(Serialize)]
pub struct ByClientResult {
    pub client: String,
    pub count: usize,
    pub cases: Vec<Indexed<Case>>,
}

impl Output for ByClientResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.cases.is_empty() {
            return format!("No cases for client '{}'.", self.client);
        }
        let mut lines = vec![format!("{} case(s) for {}:", self.count, self.client)];
        for item in &self.cases {
            lines.push(format!("  #{} {}", item.index, item.record.summary()));
        }
        lines.join("\n")
    }
}

/// Cases whose client name matches `client` exactly.
pub fn by_client(session: &Session, client: &str) -> ByClientResult {
    let cases: Vec<Indexed<Case>> = summary::cases_by_client(session.store().cases.all(), client)
        .into_iter()
        .map(|(index, case)| Indexed {
            index,
            record: case.clone(),
        })
        .collect();
    ByClientResult {
        client: client.to_string(),
        count: cases.len(),
        cases,
    }
}

// === Report ===

#[derive(Serialize)]
pub struct ReportResult {
    #[serde(flatten)]
    pub report: Report,
}

fn tally_lines(title: &str, tallies: &[Tally]) -> Vec<String> {
    let mut lines = vec![format!("{}:", title)];
    lines.extend(
        tallies
            .iter()
            .map(|t| format!("  {:<12} {}", t.label, t.count)),
    );
    lines
}

impl Output for ReportResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let r = &self.report;
        let mut lines = tally_lines("Cases by status", &r.cases_by_status);
        lines.extend(tally_lines("Tasks by priority", &r.tasks_by_priority));
        lines.extend(tally_lines("Events by status", &r.events_by_status));
        let money = |label: &str, amount: Amount| format!("  {:<12} {}", label, amount.to_currency());
        lines.push("Finance:".to_string());
        lines.push(money("Income", r.income));
        lines.push(money("Expenses", r.expenses));
        lines.push(money("Pending", r.pending));
        lines.push(money("Balance", r.balance));
        lines.join("\n")
    }
}

pub fn report(session: &Session) -> ReportResult {
    ReportResult {
        report: Report::compute(session.store()),
    }
}

// === Export ===

#[derive(Serialize)]
pub struct ExportResult {
    pub kind: EntityKind,
    pub format: &'static str,
    pub path: String,
    pub rows: usize,
    pub bytes: usize,
}

impl Output for ExportResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Exported {} {} to {} ({} bytes)",
            self.rows,
            self.kind.plural(),
            self.path,
            self.bytes
        )
    }
}

/// Write one collection as XLSX or PDF.
///
/// Without `output` the file goes to the current directory under its
/// default name (`clientes.xlsx`).
pub fn export(
    session: &Session,
    kind: EntityKind,
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<ExportResult> {
    let table = Table::for_kind(session.store(), kind);
    let bytes = export::render(&table, format)?;
    let path = match output {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(export::file_name(kind, format)),
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&path, &bytes)
        .map_err(|e| Error::Export(format!("cannot write {}: {}", path.display(), e)))?;
    Ok(ExportResult {
        kind,
        format: format.extension(),
        path: path.display().to_string(),
        rows: table.rows.len(),
        bytes: bytes.len(),
    })
}

// === Outbox ===

#[derive(Serialize)]
pub struct SyncResult {
    pub backend: String,
    pub sent: usize,
    pub remaining: usize,
}

impl Output for SyncResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        match (self.sent, self.remaining) {
            (0, 0) => format!("Nothing pending for {}.", self.backend),
            (sent, 0) => format!("Sent {} pending write(s) to {}.", sent, self.backend),
            (sent, remaining) => format!(
                "Sent {} pending write(s) to {}; {} still waiting.",
                sent, self.backend, remaining
            ),
        }
    }
}

/// Retry every write waiting in the outbox.
pub fn sync(session: &mut Session) -> SyncResult {
    let before = session.outbox().len();
    let remaining = session.flush_outbox();
    SyncResult {
        backend: session.backend().location(),
        sent: before.saturating_sub(remaining),
        remaining,
    }
}

// === Config ===

#[derive(Serialize)]
pub struct ConfigEntry {
    pub key: &'static str,
    pub value: String,
    pub source: ValueSource,
}

#[derive(Serialize)]
pub struct ConfigShow {
    pub entries: Vec<ConfigEntry>,
}

impl Output for ConfigShow {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{:<12} {}  ({})", e.key, e.value, e.source))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Every resolved setting with its source; secrets are masked.
pub fn config_show(config: &ResolvedConfig) -> ConfigShow {
    ConfigShow {
        entries: config
            .entries()
            .into_iter()
            .map(|(key, value, source)| ConfigEntry { key, value, source })
            .collect(),
    }
}

#[derive(Serialize)]
pub struct ConfigChanged {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub changed: bool,
    pub path: String,
}

impl Output for ConfigChanged {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        match (&self.value, self.changed) {
            (Some(value), _) => format!("Set {} = {} in {}", self.key, value, self.path),
            (None, true) => format!("Unset {} in {}", self.key, self.path),
            (None, false) => format!("{} was not set in {}", self.key, self.path),
        }
    }
}

/// Set a key in the session config of `data_dir`.
pub fn config_set(data_dir: &Path, key: &str, value: &str) -> Result<ConfigChanged> {
    let path = session_config_path(data_dir);
    let mut config = DocketConfig::load(&path)?;
    config.set(key, value)?;
    config.save(&path)?;
    Ok(ConfigChanged {
        key: key.to_string(),
        value: Some(value.trim().to_string()),
        changed: true,
        path: path.display().to_string(),
    })
}

/// Remove a key from the session config of `data_dir`.
pub fn config_unset(data_dir: &Path, key: &str) -> Result<ConfigChanged> {
    let path = session_config_path(data_dir);
    let mut config = DocketConfig::load(&path)?;
    let changed = config.unset(key)?;
    if changed {
        config.save(&path)?;
    }
    Ok(ConfigChanged {
        key: key.to_string(),
        value: None,
        changed,
        path: path.display().to_string(),
    })
}

/// Events in a date range for the calendar, in date order.
pub fn events_between(
    session: &Session,
    from: chrono::NaiveDate,
    to: chrono::NaiveDate,
) -> Vec<Indexed<Event>> {
    let mut events: Vec<Indexed<Event>> = session
        .store()
        .events
        .all()
        .iter()
        .enumerate()
        .filter(|(_, e)| e.starts_at.is_some_and(|at| at.date() >= from && at.date() <= to))
        .map(|(index, e)| Indexed {
            index,
            record: e.clone(),
        })
        .collect();
    events.sort_by_key(|e| e.record.starts_at);
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Client, Transaction, TransactionKind};
    use crate::storage::DisabledBackend;
    use crate::test_utils::TestEnv;

    fn session() -> Session {
        let mut session = Session::new(Box::new(DisabledBackend::new("tests")));
        session.bootstrap();
        session
    }

    #[test]
    fn test_overview_scenario() {
        let mut session = session();
        session.create(Client {
            name: "Ana".into(),
            email: "a@x.com".into(),
            phone: "111".into(),
            ..Default::default()
        });
        session.create(Case {
            client: "Ana".into(),
            process_number: "0001".into(),
            ..Default::default()
        });
        for (kind, cents) in [(TransactionKind::Income, 50_000), (TransactionKind::Expense, 12_000)] {
            session.create(Transaction {
                kind,
                amount: Amount::from_cents(cents),
                ..Default::default()
            });
        }

        let result = overview(&session);
        assert_eq!(result.overview.clients, 1);
        assert_eq!(result.balance_display, "R$ 380.00");
        assert!(result.to_human().contains("Balance: R$ 380.00"));

        let json: serde_json::Value = serde_json::from_str(&result.to_json()).unwrap();
        assert_eq!(json["clients"], 1);
        assert_eq!(json["balance"], "380.00");

        let cases = by_client(&session, "Ana");
        assert_eq!(cases.count, 1);
        assert_eq!(cases.cases[0].record.process_number, "0001");
        assert_eq!(by_client(&session, "ana").count, 0);
    }

    #[test]
    fn test_report_human_output() {
        let session = session();
        let text = report(&session).to_human();
        assert!(text.contains("Cases by status:"));
        assert!(text.contains("Aberto"));
        assert!(text.contains("R$ 0.00"));
    }

    #[test]
    fn test_export_writes_file() {
        let env = TestEnv::new();
        let mut session = session();
        session.create(Client {
            name: "Ana".into(),
            ..Default::default()
        });
        let out = env.data_path().join("out").join("clientes.pdf");

        let result = export(&session, EntityKind::Client, ExportFormat::Pdf, Some(&out)).unwrap();

        assert_eq!(result.rows, 1);
        assert!(std::fs::read(&out).unwrap().starts_with(b"%PDF"));
    }

    #[test]
    fn test_config_set_and_unset() {
        let env = TestEnv::new();
        let set = config_set(env.data_path(), "backend", "none").unwrap();
        assert!(set.changed);
        let config = DocketConfig::load(&session_config_path(env.data_path())).unwrap();
        assert_eq!(config.backend, Some(crate::storage::BackendType::Disabled));

        assert!(config_unset(env.data_path(), "backend").unwrap().changed);
        assert!(!config_unset(env.data_path(), "backend").unwrap().changed);
        assert!(config_set(env.data_path(), "colour", "blue").is_err());
    }

    #[test]
    fn test_sync_with_nothing_pending() {
        let mut session = session();
        let result = sync(&mut session);
        assert_eq!(result.sent, 0);
        assert!(result.to_human().starts_with("Nothing pending"));
    }
}
