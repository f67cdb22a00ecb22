//! CLI argument definitions for docket.

use crate::commands::records::FieldValues;
use crate::export::ExportFormat;
use crate::models::{EntityKind, Filter, parse_date};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

/// Docket - clients, cases, deadlines and finances for a small law practice.
///
/// Start with `docket overview`, or `docket serve` for the web app.
#[derive(Parser, Debug)]
#[command(name = "docket")]
#[command(author, version, long_version = long_version(), about = "Case management for small law practices", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Directory holding records, config and logs.
    /// Can also be set via DOCKET_DATA_DIR.
    #[arg(long = "data-dir", global = true, env = "DOCKET_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Persistence backend for this run: file, sheets, proxy or none
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Write diagnostics to stderr as JSON lines
    #[arg(long = "log-json", global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\ncommit: ",
        env!("DOCKET_GIT_COMMIT"),
        "\nbuilt:  ",
        env!("DOCKET_BUILD_TIMESTAMP")
    )
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Counts, balance and upcoming events (start here)
    Overview,

    /// Client management commands
    Client {
        #[command(subcommand)]
        command: ClientCommands,
    },

    /// Case management commands
    Case {
        #[command(subcommand)]
        command: CaseCommands,
    },

    /// Task management commands
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Calendar event commands (hearings, deadlines, meetings)
    Event {
        #[command(subcommand)]
        command: EventCommands,
    },

    /// Financial transaction commands
    #[command(visible_alias = "transaction")]
    Txn {
        #[command(subcommand)]
        command: TxnCommands,
    },

    /// Document commands
    #[command(visible_alias = "document")]
    Doc {
        #[command(subcommand)]
        command: DocCommands,
    },

    /// List the cases of one client (exact name match)
    ByClient {
        /// Client name
        name: String,
    },

    /// Case, task, event and finance breakdowns
    Report,

    /// Export a collection as XLSX or PDF
    Export {
        /// Record type (clients, cases, tasks, events, transactions, documents)
        #[arg(value_parser = parse_entity)]
        entity: EntityKind,

        /// Output format: xlsx or pdf
        #[arg(short, long, default_value = "xlsx", value_parser = parse_format)]
        format: ExportFormat,

        /// Output file (default: <sheet>.<format> in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Retry writes waiting for the persistence backend
    Sync,

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Start the web app (requires 'gui' feature)
    #[cfg(feature = "gui")]
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "DOCKET_PORT", default_value_t = crate::gui::DEFAULT_PORT)]
        port: u16,

        /// Host address to bind to (use 0.0.0.0 for network access)
        #[arg(long, env = "DOCKET_HOST", default_value = "127.0.0.1")]
        host: String,
    },
}

fn parse_entity(s: &str) -> Result<EntityKind, String> {
    s.parse().map_err(|e: crate::Error| e.to_string())
}

fn parse_format(s: &str) -> Result<ExportFormat, String> {
    s.parse().map_err(|e: crate::Error| e.to_string())
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).ok_or_else(|| format!("invalid date '{}' (expected YYYY-MM-DD)", s))
}

/// Search options shared by every `list` command.
#[derive(Args, Debug, Clone, Default, Serialize)]
pub struct ListArgs {
    /// Case-insensitive text search
    #[arg(short, long)]
    pub search: Option<String>,

    /// Status, priority or payment status to keep ("all" for everything)
    #[arg(long)]
    pub status: Option<String>,

    /// Keep tasks due on or before this date
    #[arg(long = "due-before", value_parser = parse_date_arg)]
    pub due_before: Option<NaiveDate>,
}

impl ListArgs {
    pub fn filter(&self) -> Filter {
        let mut filter = Filter::new();
        if let Some(text) = &self.search {
            filter = filter.with_text(text.clone());
        }
        if let Some(status) = &self.status {
            filter = filter.with_category(status.clone());
        }
        if let Some(cutoff) = self.due_before {
            filter = filter.with_due_cutoff(cutoff);
        }
        filter
    }
}

/// Collect the flags that were given, by field key.
macro_rules! field_values {
    ($self:ident: $($field:ident),+ $(,)?) => {{
        let mut values: FieldValues = Vec::new();
        $(
            if let Some(value) = &$self.$field {
                values.push((stringify!($field), value.clone()));
            }
        )+
        values
    }};
}

#[derive(Args, Debug, Clone, Default, Serialize)]
pub struct ClientFields {
    /// Full name
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

impl ClientFields {
    pub fn values(&self) -> FieldValues {
        field_values!(self: name, email, phone, notes)
    }
}

#[derive(Args, Debug, Clone, Default, Serialize)]
pub struct CaseFields {
    /// Client name
    #[arg(long)]
    pub client: Option<String>,
    /// Court process number
    #[arg(long = "number")]
    pub process_number: Option<String>,
    #[arg(long)]
    pub parties: Option<String>,
    #[arg(long)]
    pub lawyer: Option<String>,
    /// Opening date (YYYY-MM-DD)
    #[arg(long = "opened")]
    pub opened_on: Option<String>,
    /// open, closed or suspended
    #[arg(long)]
    pub status: Option<String>,
}

impl CaseFields {
    pub fn values(&self) -> FieldValues {
        field_values!(self: client, process_number, parties, lawyer, opened_on, status)
    }
}

#[derive(Args, Debug, Clone, Default, Serialize)]
pub struct TaskFields {
    #[arg(long)]
    pub description: Option<String>,
    /// low, medium or high
    #[arg(long)]
    pub priority: Option<String>,
    /// Due date (YYYY-MM-DD)
    #[arg(long = "due")]
    pub due_on: Option<String>,
    #[arg(long)]
    pub client: Option<String>,
    /// Process number of the related case
    #[arg(long)]
    pub case: Option<String>,
}

impl TaskFields {
    pub fn values(&self) -> FieldValues {
        field_values!(self: description, priority, due_on, client, case)
    }
}

#[derive(Args, Debug, Clone, Default, Serialize)]
pub struct EventFields {
    #[arg(long)]
    pub title: Option<String>,
    /// hearing, deadline or meeting
    #[arg(long = "type")]
    pub kind: Option<String>,
    /// Date and time (YYYY-MM-DD HH:MM)
    #[arg(long = "at")]
    pub starts_at: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub client: Option<String>,
    #[arg(long)]
    pub case: Option<String>,
    /// scheduled, done or cancelled
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
}

impl EventFields {
    pub fn values(&self) -> FieldValues {
        field_values!(self: title, kind, starts_at, location, client, case, status, description)
    }
}

#[derive(Args, Debug, Clone, Default, Serialize)]
pub struct TxnFields {
    /// income or expense (Receita/Despesa accepted)
    #[arg(long)]
    pub kind: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    /// Non-negative amount, e.g. 1234.56 or "R$ 1.234,56"
    #[arg(long, allow_hyphen_values = true)]
    pub amount: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// Date (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<String>,
    /// pending or paid
    #[arg(long)]
    pub payment: Option<String>,
    #[arg(long)]
    pub client: Option<String>,
    #[arg(long)]
    pub case: Option<String>,
}

impl TxnFields {
    pub fn values(&self) -> FieldValues {
        field_values!(self: kind, category, amount, description, date, payment, client, case)
    }
}

#[derive(Args, Debug, Clone, Default, Serialize)]
pub struct DocFields {
    #[arg(long)]
    pub client: Option<String>,
    #[arg(long)]
    pub case: Option<String>,
    #[arg(long)]
    pub title: Option<String>,
    /// File name or link to record as-is
    #[arg(long)]
    pub file: Option<String>,
}

impl DocFields {
    pub fn values(&self) -> FieldValues {
        field_values!(self: client, case, title, file)
    }
}

/// What a record subcommand asks for, independent of the record type.
#[derive(Debug, Clone)]
pub enum RecordAction {
    Add {
        fields: FieldValues,
        upload: Option<PathBuf>,
    },
    List(Filter),
    Edit {
        index: usize,
        fields: FieldValues,
    },
    Remove {
        index: usize,
    },
}

/// Declares the add/list/edit/rm subcommands of one record type.
macro_rules! record_commands {
    ($(#[$meta:meta])* $name:ident, $fields:ident, $what:literal) => {
        $(#[$meta])*
        #[derive(Subcommand, Debug)]
        pub enum $name {
            #[command(about = concat!("Create a ", $what))]
            Add {
                #[command(flatten)]
                fields: $fields,
            },
            #[command(about = concat!("List ", $what, " records"))]
            List {
                #[command(flatten)]
                filter: ListArgs,
            },
            #[command(about = concat!("Change fields of the ", $what, " at INDEX"))]
            Edit {
                /// Position shown by `list`
                index: usize,
                #[command(flatten)]
                fields: $fields,
            },
            #[command(about = concat!("Remove the ", $what, " at INDEX"))]
            Rm {
                /// Position shown by `list`
                index: usize,
            },
        }

        impl $name {
            pub fn action(&self) -> RecordAction {
                match self {
                    $name::Add { fields } => RecordAction::Add {
                        fields: fields.values(),
                        upload: None,
                    },
                    $name::List { filter } => RecordAction::List(filter.filter()),
                    $name::Edit { index, fields } => RecordAction::Edit {
                        index: *index,
                        fields: fields.values(),
                    },
                    $name::Rm { index } => RecordAction::Remove { index: *index },
                }
            }

            /// Subcommand name and arguments for the action log.
            pub fn describe(&self) -> (&'static str, serde_json::Value) {
                match self {
                    $name::Add { fields } => ("add", serde_json::json!({ "fields": fields })),
                    $name::List { filter } => ("list", serde_json::json!(filter)),
                    $name::Edit { index, fields } => (
                        "edit",
                        serde_json::json!({ "index": index, "fields": fields }),
                    ),
                    $name::Rm { index } => ("rm", serde_json::json!({ "index": index })),
                }
            }
        }
    };
}

record_commands!(
    /// Client subcommands
    ClientCommands, ClientFields, "client"
);
record_commands!(
    /// Case subcommands
    CaseCommands, CaseFields, "case"
);
record_commands!(
    /// Task subcommands
    TaskCommands, TaskFields, "task"
);
record_commands!(
    /// Event subcommands
    EventCommands, EventFields, "event"
);
record_commands!(
    /// Transaction subcommands
    TxnCommands, TxnFields, "transaction"
);

/// Document subcommands
#[derive(Subcommand, Debug)]
pub enum DocCommands {
    /// Create a document, optionally uploading a file
    Add {
        #[command(flatten)]
        fields: DocFields,

        /// File to upload to the backend; its link is stored on the document
        #[arg(long)]
        upload: Option<PathBuf>,
    },
    /// List document records
    List {
        #[command(flatten)]
        filter: ListArgs,
    },
    /// Change fields of the document at INDEX
    Edit {
        /// Position shown by `list`
        index: usize,
        #[command(flatten)]
        fields: DocFields,
    },
    /// Remove the document at INDEX
    Rm {
        /// Position shown by `list`
        index: usize,
    },
}

impl DocCommands {
    pub fn action(&self) -> RecordAction {
        match self {
            DocCommands::Add { fields, upload } => RecordAction::Add {
                fields: fields.values(),
                upload: upload.clone(),
            },
            DocCommands::List { filter } => RecordAction::List(filter.filter()),
            DocCommands::Edit { index, fields } => RecordAction::Edit {
                index: *index,
                fields: fields.values(),
            },
            DocCommands::Rm { index } => RecordAction::Remove { index: *index },
        }
    }

    pub fn describe(&self) -> (&'static str, serde_json::Value) {
        match self {
            DocCommands::Add { fields, upload } => (
                "add",
                serde_json::json!({ "fields": fields, "upload": upload }),
            ),
            DocCommands::List { filter } => ("list", serde_json::json!(filter)),
            DocCommands::Edit { index, fields } => (
                "edit",
                serde_json::json!({ "index": index, "fields": fields }),
            ),
            DocCommands::Rm { index } => ("rm", serde_json::json!({ "index": index })),
        }
    }
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show every resolved setting and where it came from
    Show,

    /// Set a key in the data directory's config.kdl
    Set {
        /// backend, spreadsheet, drive-root, credentials-file, proxy-url or action-log
        key: String,
        value: String,
    },

    /// Remove a key from the data directory's config.kdl
    Unset {
        key: String,
    },
}
