//! Data models for docket records.
//!
//! This module defines the six record types a practice keeps:
//! - `Client` - People the practice represents (name is the join key)
//! - `Case` - Court proceedings (process number is the join key)
//! - `Task` - To-dos with priority and due date
//! - `Event` - Hearings, deadlines and meetings on the calendar
//! - `Transaction` - Income and expenses
//! - `Document` - Files attached to a client or case
//!
//! Records are flat. References between them (`client`, `case`) are plain
//! strings that are expected, but never required, to match a join key.
//!
//! Every record converts to and from a [`Row`], the field map used by the
//! persistence backends. Column names are the Portuguese field labels.

pub mod fields;
pub mod filter;
pub mod money;
pub mod summary;

pub use fields::{Editable, FieldKind, FieldSpec, apply_fields};
pub use filter::{Filter, Searchable};
pub use money::Amount;

use crate::storage::{Collection, Store};
use crate::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One record as a map from column header to cell text.
pub type Row = BTreeMap<String, String>;

/// Date format used in rows and forms.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Date-time format used in rows and forms.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Column holding the surrogate record id.
pub const ID_COLUMN: &str = "ID";

/// Declares a closed enumeration with a stable key, a display label and
/// accepted aliases.
macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident ($what:literal) {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $key:literal, $label:literal $(, $alias:literal)*;
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $key)]
                $variant,
            )+
        }

        impl $name {
            /// All values, in display order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// `(key, label)` pairs for select inputs.
            pub fn options() -> Vec<(&'static str, &'static str)> {
                Self::ALL.iter().map(|v| (v.as_str(), v.label())).collect()
            }

            /// Stable machine key.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $key,)+
                }
            }

            /// Display label.
            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            /// Parse a key, English name, label or alias (case-insensitive).
            pub fn parse(s: &str) -> Option<Self> {
                let wanted = s.trim().to_lowercase();
                $(
                    if wanted == $key
                        || wanted == stringify!($variant).to_lowercase()
                        || wanted == $label.to_lowercase()
                        $(|| wanted == $alias.to_lowercase())*
                    {
                        return Some($name::$variant);
                    }
                )+
                None
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.label())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                $name::parse(s).ok_or_else(|| {
                    let expected: Vec<&str> = $name::ALL.iter().map(|v| v.as_str()).collect();
                    Error::InvalidInput(format!(
                        "invalid {}: '{}' (expected one of: {})",
                        $what,
                        s,
                        expected.join(", ")
                    ))
                })
            }
        }
    };
}

closed_enum! {
    /// Lifecycle status of a case.
    pub enum CaseStatus ("case status") {
        #[default]
        Open => "open", "Aberto", "em andamento";
        Closed => "closed", "Fechado", "encerrado";
        Suspended => "suspended", "Suspenso";
    }
}

closed_enum! {
    /// Task priority.
    pub enum Priority ("priority") {
        Low => "low", "Baixa";
        #[default]
        Medium => "medium", "Média", "media";
        High => "high", "Alta";
    }
}

closed_enum! {
    /// Kind of calendar event.
    pub enum EventKind ("event type") {
        #[default]
        Hearing => "hearing", "Audiência", "audiencia";
        Deadline => "deadline", "Prazo";
        Meeting => "meeting", "Reunião", "reuniao";
    }
}

closed_enum! {
    /// Status of a calendar event.
    pub enum EventStatus ("event status") {
        #[default]
        Scheduled => "scheduled", "Agendado";
        Done => "done", "Realizado", "concluído";
        Cancelled => "cancelled", "Cancelado", "canceled";
    }
}

closed_enum! {
    /// Direction of money flow.
    pub enum TransactionKind ("transaction kind") {
        #[default]
        Income => "income", "Receita", "entrada";
        Expense => "expense", "Despesa", "saída", "saida";
    }
}

closed_enum! {
    /// Whether a transaction has been settled.
    pub enum PaymentStatus ("payment status") {
        #[default]
        Pending => "pending", "Pendente";
        Paid => "paid", "Pago";
    }
}

/// The six record types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Client,
    Case,
    Task,
    Event,
    Transaction,
    Document,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Client,
        EntityKind::Case,
        EntityKind::Task,
        EntityKind::Event,
        EntityKind::Transaction,
        EntityKind::Document,
    ];

    /// Singular machine name (`client`).
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Client => "client",
            EntityKind::Case => "case",
            EntityKind::Task => "task",
            EntityKind::Event => "event",
            EntityKind::Transaction => "transaction",
            EntityKind::Document => "document",
        }
    }

    /// Plural name, used as URL segment (`clients`).
    pub fn plural(&self) -> &'static str {
        match self {
            EntityKind::Client => "clients",
            EntityKind::Case => "cases",
            EntityKind::Task => "tasks",
            EntityKind::Event => "events",
            EntityKind::Transaction => "transactions",
            EntityKind::Document => "documents",
        }
    }

    /// Name of the remote sheet holding this kind.
    pub fn sheet_name(&self) -> &'static str {
        match self {
            EntityKind::Client => "Clientes",
            EntityKind::Case => "Casos",
            EntityKind::Task => "Tarefas",
            EntityKind::Event => "Agenda",
            EntityKind::Transaction => "Financeiro",
            EntityKind::Document => "Documentos",
        }
    }

    /// Singular display label.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Client => "Cliente",
            EntityKind::Case => "Caso",
            EntityKind::Task => "Tarefa",
            EntityKind::Event => "Evento",
            EntityKind::Transaction => "Movimento",
            EntityKind::Document => "Documento",
        }
    }

    /// Prefix of generated record ids.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            EntityKind::Client => "cli",
            EntityKind::Case => "cas",
            EntityKind::Task => "tsk",
            EntityKind::Event => "evt",
            EntityKind::Transaction => "txn",
            EntityKind::Document => "doc",
        }
    }

    /// Column headers of the sheet, `ID` first.
    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Client => &[ID_COLUMN, "Nome", "Email", "Telefone", "Anotações"],
            EntityKind::Case => &[
                ID_COLUMN,
                "Cliente",
                "Número do Processo",
                "Partes",
                "Advogado",
                "Data de Abertura",
                "Status",
            ],
            EntityKind::Task => &[ID_COLUMN, "Descrição", "Prioridade", "Prazo", "Cliente", "Caso"],
            EntityKind::Event => &[
                ID_COLUMN,
                "Título",
                "Tipo",
                "Data/Hora",
                "Local",
                "Cliente",
                "Caso",
                "Status",
                "Descrição",
            ],
            EntityKind::Transaction => &[
                ID_COLUMN,
                "Tipo",
                "Categoria",
                "Valor",
                "Descrição",
                "Data",
                "Status do Pagamento",
                "Cliente",
                "Caso",
            ],
            EntityKind::Document => &[ID_COLUMN, "Cliente", "Caso", "Título", "Arquivo"],
        }
    }

    /// Parse a singular or plural name, or a sheet name.
    pub fn parse(s: &str) -> Option<Self> {
        let wanted = s.trim().to_lowercase();
        let wanted = match wanted.as_str() {
            "txn" | "txns" | "finance" | "financeiro" => "transaction",
            "doc" | "docs" => "document",
            "calendar" | "agenda" => "event",
            other => other,
        };
        Self::ALL.into_iter().find(|kind| {
            wanted == kind.as_str()
                || wanted == kind.plural()
                || wanted == kind.sheet_name().to_lowercase()
        })
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::InvalidInput(format!("unknown record type: '{}'", s)))
    }
}

/// Generate a fresh surrogate id such as `cli-3f2a9c1b`.
pub fn generate_id(kind: EntityKind) -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", kind.id_prefix(), &hex[..8])
}

/// Behaviour shared by all record types.
///
/// Records are addressed by position inside their [`Collection`]; the `id`
/// is assigned by the store on append and survives replacement.
pub trait Record: Clone + fmt::Debug + PartialEq + Serialize + Send + Sync + 'static {
    /// Which kind of record this is.
    const KIND: EntityKind;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    /// Cell values in the order of `KIND.headers()`.
    fn to_row(&self) -> Vec<String>;

    /// Build a record from a row. Unparseable cells fall back to defaults
    /// and push a message onto `warnings`.
    fn from_row(row: &Row, warnings: &mut Vec<String>) -> Self;

    /// One-line human-readable summary.
    fn summary(&self) -> String;

    fn collection(store: &Store) -> &Collection<Self>;

    fn collection_mut(store: &mut Store) -> &mut Collection<Self>;
}

// === Row helpers ===

fn cell(row: &Row, header: &str) -> String {
    row.get(header).map(|v| v.trim().to_string()).unwrap_or_default()
}

fn optional_cell(row: &Row, header: &str) -> Option<String> {
    let value = cell(row, header);
    if value.is_empty() { None } else { Some(value) }
}

fn id_cell(row: &Row) -> String {
    cell(row, ID_COLUMN)
}

/// Parse a date typed by a person or rendered by a spreadsheet.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .ok()
}

/// Parse a date-time in `YYYY-MM-DD HH:MM`, ISO `T` form, or `DD/MM/YYYY HH:MM`.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%d/%m/%Y %H:%M"))
        .ok()
        .or_else(|| parse_date(s).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

fn date_cell(
    row: &Row,
    header: &str,
    kind: EntityKind,
    warnings: &mut Vec<String>,
) -> Option<NaiveDate> {
    let raw = cell(row, header);
    if raw.is_empty() {
        return None;
    }
    let parsed = parse_date(&raw);
    if parsed.is_none() {
        warnings.push(format!("{}: ignoring invalid {} '{}'", kind.sheet_name(), header, raw));
    }
    parsed
}

fn datetime_cell(
    row: &Row,
    header: &str,
    kind: EntityKind,
    warnings: &mut Vec<String>,
) -> Option<NaiveDateTime> {
    let raw = cell(row, header);
    if raw.is_empty() {
        return None;
    }
    let parsed = parse_datetime(&raw);
    if parsed.is_none() {
        warnings.push(format!("{}: ignoring invalid {} '{}'", kind.sheet_name(), header, raw));
    }
    parsed
}

fn enum_cell<E: FromStr + Default>(
    row: &Row,
    header: &str,
    kind: EntityKind,
    warnings: &mut Vec<String>,
) -> E {
    let raw = cell(row, header);
    if raw.is_empty() {
        return E::default();
    }
    match raw.parse() {
        Ok(value) => value,
        Err(_) => {
            warnings.push(format!(
                "{}: unknown {} '{}', using default",
                kind.sheet_name(),
                header,
                raw
            ));
            E::default()
        }
    }
}

fn amount_cell(row: &Row, header: &str, kind: EntityKind, warnings: &mut Vec<String>) -> Amount {
    let raw = cell(row, header);
    if raw.is_empty() {
        return Amount::ZERO;
    }
    match Amount::parse_signed(&raw) {
        Ok(amount) if amount.is_negative() => {
            warnings.push(format!(
                "{}: negative {} '{}', using its absolute value",
                kind.sheet_name(),
                header,
                raw
            ));
            -amount
        }
        Ok(amount) => amount,
        Err(_) => {
            warnings.push(format!("{}: invalid {} '{}', using 0", kind.sheet_name(), header, raw));
            Amount::ZERO
        }
    }
}

fn fmt_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or_default()
}

fn fmt_datetime(dt: Option<NaiveDateTime>) -> String {
    dt.map(|d| d.format(DATETIME_FORMAT).to_string()).unwrap_or_default()
}

fn opt_str(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

// === Records ===

/// A person or company the practice represents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notes: String,
}

impl Record for Client {
    const KIND: EntityKind = EntityKind::Client;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.email.clone(),
            self.phone.clone(),
            self.notes.clone(),
        ]
    }

    fn from_row(row: &Row, _warnings: &mut Vec<String>) -> Self {
        Self {
            id: id_cell(row),
            name: cell(row, "Nome"),
            email: cell(row, "Email"),
            phone: cell(row, "Telefone"),
            notes: cell(row, "Anotações"),
        }
    }

    fn summary(&self) -> String {
        let mut line = self.name.clone();
        if !self.email.is_empty() {
            line.push_str(&format!(" <{}>", self.email));
        }
        if !self.phone.is_empty() {
            line.push_str(&format!(" {}", self.phone));
        }
        line
    }

    fn collection(store: &Store) -> &Collection<Self> {
        &store.clients
    }

    fn collection_mut(store: &mut Store) -> &mut Collection<Self> {
        &mut store.clients
    }
}

/// A legal case, identified informally by its process number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: String,
    /// Client name
    pub client: String,
    pub process_number: String,
    pub parties: String,
    pub lawyer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opened_on: Option<NaiveDate>,
    pub status: CaseStatus,
}

impl Record for Case {
    const KIND: EntityKind = EntityKind::Case;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.client.clone(),
            self.process_number.clone(),
            self.parties.clone(),
            self.lawyer.clone(),
            fmt_date(self.opened_on),
            self.status.label().to_string(),
        ]
    }

    fn from_row(row: &Row, warnings: &mut Vec<String>) -> Self {
        let kind = Self::KIND;
        Self {
            id: id_cell(row),
            client: cell(row, "Cliente"),
            process_number: cell(row, "Número do Processo"),
            parties: cell(row, "Partes"),
            lawyer: cell(row, "Advogado"),
            opened_on: date_cell(row, "Data de Abertura", kind, warnings),
            status: enum_cell(row, "Status", kind, warnings),
        }
    }

    fn summary(&self) -> String {
        format!("{} - {} [{}]", self.process_number, self.client, self.status)
    }

    fn collection(store: &Store) -> &Collection<Self> {
        &store.cases
    }

    fn collection_mut(store: &mut Store) -> &mut Collection<Self> {
        &mut store.cases
    }
}

/// Something that needs doing, optionally tied to a client or case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub description: String,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case: Option<String>,
}

impl Record for Task {
    const KIND: EntityKind = EntityKind::Task;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.description.clone(),
            self.priority.label().to_string(),
            fmt_date(self.due_on),
            opt_str(&self.client),
            opt_str(&self.case),
        ]
    }

    fn from_row(row: &Row, warnings: &mut Vec<String>) -> Self {
        let kind = Self::KIND;
        Self {
            id: id_cell(row),
            description: cell(row, "Descrição"),
            priority: enum_cell(row, "Prioridade", kind, warnings),
            due_on: date_cell(row, "Prazo", kind, warnings),
            client: optional_cell(row, "Cliente"),
            case: optional_cell(row, "Caso"),
        }
    }

    fn summary(&self) -> String {
        let mut line = format!("[{}] {}", self.priority, self.description);
        if let Some(due) = self.due_on {
            line.push_str(&format!(" (prazo {})", due.format(DATE_FORMAT)));
        }
        line
    }

    fn collection(store: &Store) -> &Collection<Self> {
        &store.tasks
    }

    fn collection_mut(store: &mut Store) -> &mut Collection<Self> {
        &mut store.tasks
    }
}

/// A calendar entry: hearing, deadline or meeting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<NaiveDateTime>,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case: Option<String>,
    pub status: EventStatus,
    pub description: String,
}

impl Record for Event {
    const KIND: EntityKind = EntityKind::Event;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.title.clone(),
            self.kind.label().to_string(),
            fmt_datetime(self.starts_at),
            self.location.clone(),
            opt_str(&self.client),
            opt_str(&self.case),
            self.status.label().to_string(),
            self.description.clone(),
        ]
    }

    fn from_row(row: &Row, warnings: &mut Vec<String>) -> Self {
        let kind = Self::KIND;
        Self {
            id: id_cell(row),
            title: cell(row, "Título"),
            kind: enum_cell(row, "Tipo", kind, warnings),
            starts_at: datetime_cell(row, "Data/Hora", kind, warnings),
            location: cell(row, "Local"),
            client: optional_cell(row, "Cliente"),
            case: optional_cell(row, "Caso"),
            status: enum_cell(row, "Status", kind, warnings),
            description: cell(row, "Descrição"),
        }
    }

    fn summary(&self) -> String {
        format!(
            "{} {} ({}) [{}]",
            fmt_datetime(self.starts_at),
            self.title,
            self.kind,
            self.status
        )
        .trim_start()
        .to_string()
    }

    fn collection(store: &Store) -> &Collection<Self> {
        &store.events
    }

    fn collection_mut(store: &mut Store) -> &mut Collection<Self> {
        &mut store.events
    }
}

/// Money in or out of the practice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub kind: TransactionKind,
    pub category: String,
    pub amount: Amount,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub payment: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case: Option<String>,
}

impl Transaction {
    /// Amount with sign applied: positive for income, negative for expense.
    pub fn signed_amount(&self) -> Amount {
        match self.kind {
            TransactionKind::Income => self.amount,
            TransactionKind::Expense => -self.amount,
        }
    }
}

impl Record for Transaction {
    const KIND: EntityKind = EntityKind::Transaction;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.kind.label().to_string(),
            self.category.clone(),
            self.amount.to_string(),
            self.description.clone(),
            fmt_date(self.date),
            self.payment.label().to_string(),
            opt_str(&self.client),
            opt_str(&self.case),
        ]
    }

    fn from_row(row: &Row, warnings: &mut Vec<String>) -> Self {
        let kind = Self::KIND;
        Self {
            id: id_cell(row),
            kind: enum_cell(row, "Tipo", kind, warnings),
            category: cell(row, "Categoria"),
            amount: amount_cell(row, "Valor", kind, warnings),
            description: cell(row, "Descrição"),
            date: date_cell(row, "Data", kind, warnings),
            payment: enum_cell(row, "Status do Pagamento", kind, warnings),
            client: optional_cell(row, "Cliente"),
            case: optional_cell(row, "Caso"),
        }
    }

    fn summary(&self) -> String {
        let mut line = format!("{} {}", self.kind, self.amount.to_currency());
        if !self.description.is_empty() {
            line.push_str(&format!(" - {}", self.description));
        }
        line.push_str(&format!(" [{}]", self.payment));
        line
    }

    fn collection(store: &Store) -> &Collection<Self> {
        &store.transactions
    }

    fn collection_mut(store: &mut Store) -> &mut Collection<Self> {
        &mut store.transactions
    }
}

/// A file kept for a client, by name or remote link.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub client: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case: Option<String>,
    pub title: String,
    /// File name or remote link
    pub file: String,
}

impl Record for Document {
    const KIND: EntityKind = EntityKind::Document;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.client.clone(),
            opt_str(&self.case),
            self.title.clone(),
            self.file.clone(),
        ]
    }

    fn from_row(row: &Row, _warnings: &mut Vec<String>) -> Self {
        Self {
            id: id_cell(row),
            client: cell(row, "Cliente"),
            case: optional_cell(row, "Caso"),
            title: cell(row, "Título"),
            file: cell(row, "Arquivo"),
        }
    }

    fn summary(&self) -> String {
        format!("{} ({}) {}", self.title, self.client, self.file)
            .trim_end()
            .to_string()
    }

    fn collection(store: &Store) -> &Collection<Self> {
        &store.documents
    }

    fn collection_mut(store: &mut Store) -> &mut Collection<Self> {
        &mut store.documents
    }
}

/// Zip a record's cells with its headers into a [`Row`].
pub fn to_row_map<T: Record>(record: &T) -> Row {
    T::KIND
        .headers()
        .iter()
        .map(|h| h.to_string())
        .zip(record.to_row())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_parse_accepts_keys_names_and_labels() {
        assert_eq!(CaseStatus::parse("open"), Some(CaseStatus::Open));
        assert_eq!(CaseStatus::parse("Suspenso"), Some(CaseStatus::Suspended));
        assert_eq!(Priority::parse("MÉDIA"), Some(Priority::Medium));
        assert_eq!(TransactionKind::parse("Receita"), Some(TransactionKind::Income));
        assert_eq!(TransactionKind::parse("Saída"), Some(TransactionKind::Expense));
        assert_eq!(EventKind::parse("audiencia"), Some(EventKind::Hearing));
        assert_eq!(PaymentStatus::parse("whatever"), None);
    }

    #[test]
    fn test_enum_from_str_lists_expected_values() {
        let err = "bogus".parse::<CaseStatus>().unwrap_err();
        assert!(err.to_string().contains("open, closed, suspended"));
    }

    #[test]
    fn test_enum_serializes_as_key() {
        assert_eq!(serde_json::to_string(&EventStatus::Cancelled).unwrap(), "\"cancelled\"");
        assert_eq!(CaseStatus::default(), CaseStatus::Open);
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn test_entity_kind_parse() {
        assert_eq!(EntityKind::parse("clients"), Some(EntityKind::Client));
        assert_eq!(EntityKind::parse("Financeiro"), Some(EntityKind::Transaction));
        assert_eq!(EntityKind::parse("txn"), Some(EntityKind::Transaction));
        assert_eq!(EntityKind::parse("calendar"), Some(EntityKind::Event));
        assert_eq!(EntityKind::parse("nope"), None);
    }

    #[test]
    fn test_generate_id_uses_prefix() {
        let id = generate_id(EntityKind::Case);
        assert!(id.starts_with("cas-"));
        assert_eq!(id.len(), 12);
    }

    #[test]
    fn test_headers_match_row_width() {
        let mut warnings = Vec::new();
        let empty = Row::new();
        assert_eq!(Client::from_row(&empty, &mut warnings).to_row().len(), EntityKind::Client.headers().len());
        assert_eq!(Case::from_row(&empty, &mut warnings).to_row().len(), EntityKind::Case.headers().len());
        assert_eq!(Task::from_row(&empty, &mut warnings).to_row().len(), EntityKind::Task.headers().len());
        assert_eq!(Event::from_row(&empty, &mut warnings).to_row().len(), EntityKind::Event.headers().len());
        assert_eq!(
            Transaction::from_row(&empty, &mut warnings).to_row().len(),
            EntityKind::Transaction.headers().len()
        );
        assert_eq!(
            Document::from_row(&empty, &mut warnings).to_row().len(),
            EntityKind::Document.headers().len()
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_transaction_from_row_is_lenient() {
        let mut row = Row::new();
        row.insert("Tipo".to_string(), "Entrada".to_string());
        row.insert("Valor".to_string(), "R$ 1.500,00".to_string());
        row.insert("Data".to_string(), "31/01/2024".to_string());
        row.insert("Status do Pagamento".to_string(), "talvez".to_string());

        let mut warnings = Vec::new();
        let txn = Transaction::from_row(&row, &mut warnings);

        assert_eq!(txn.kind, TransactionKind::Income);
        assert_eq!(txn.amount, Amount::from_cents(150_000));
        assert_eq!(txn.date, NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(txn.payment, PaymentStatus::Pending);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("talvez"));
    }

    #[test]
    fn test_case_row_map_uses_labels() {
        let case = Case {
            id: "cas-00000001".to_string(),
            client: "Ana".to_string(),
            process_number: "0001234-55.2024".to_string(),
            status: CaseStatus::Suspended,
            opened_on: NaiveDate::from_ymd_opt(2024, 3, 1),
            ..Default::default()
        };
        let row = to_row_map(&case);
        assert_eq!(row["Status"], "Suspenso");
        assert_eq!(row["Data de Abertura"], "2024-03-01");
        assert_eq!(row[ID_COLUMN], "cas-00000001");

        let mut warnings = Vec::new();
        assert_eq!(Case::from_row(&row, &mut warnings), case);
    }

    #[test]
    fn test_parse_datetime_variants() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap().and_hms_opt(14, 30, 0);
        assert_eq!(parse_datetime("2024-05-02 14:30"), expected);
        assert_eq!(parse_datetime("2024-05-02T14:30"), expected);
        assert_eq!(parse_datetime("02/05/2024 14:30"), expected);
        assert!(parse_datetime("yesterday").is_none());
    }
}
