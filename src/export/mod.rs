//! Export of record collections to XLSX and PDF.
//!
//! A collection is first turned into a [`Table`] (title, headers, text
//! cells) and then encoded. Both encoders work on the same table so the two
//! formats always show the same columns.

pub mod pdf;
pub mod xlsx;

use crate::models::{Case, Client, Document, EntityKind, Event, Record, Task, Transaction};
use crate::storage::Store;
use crate::{Error, Result};

/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Pdf,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "xlsx" | "excel" => Some(Self::Xlsx),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Pdf => "application/pdf",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| {
            Error::InvalidInput(format!("unknown export format '{}' (expected xlsx or pdf)", s))
        })
    }
}

/// Rows ready to be encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Table of one record type. The surrogate id column is left out.
    pub fn from_records<T: Record>(records: &[T]) -> Self {
        Self {
            title: T::KIND.sheet_name().to_string(),
            headers: T::KIND
                .headers()
                .iter()
                .skip(1)
                .map(|h| h.to_string())
                .collect(),
            rows: records
                .iter()
                .map(|r| r.to_row().into_iter().skip(1).collect())
                .collect(),
        }
    }

    /// Table of a whole collection in the store.
    pub fn for_kind(store: &Store, kind: EntityKind) -> Self {
        match kind {
            EntityKind::Client => Self::from_records::<Client>(store.all()),
            EntityKind::Case => Self::from_records::<Case>(store.all()),
            EntityKind::Task => Self::from_records::<Task>(store.all()),
            EntityKind::Event => Self::from_records::<Event>(store.all()),
            EntityKind::Transaction => Self::from_records::<Transaction>(store.all()),
            EntityKind::Document => Self::from_records::<Document>(store.all()),
        }
    }
}

/// Encode a table in the given format.
pub fn render(table: &Table, format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Xlsx => xlsx::render(table),
        ExportFormat::Pdf => Ok(pdf::render(table)),
    }
}

/// Suggested file name for an export (`clientes.xlsx`).
pub fn file_name(kind: EntityKind, format: ExportFormat) -> String {
    format!("{}.{}", kind.sheet_name().to_lowercase(), format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Amount, TransactionKind};

    #[test]
    fn test_format_parse() {
        assert_eq!(ExportFormat::parse("XLSX"), Some(ExportFormat::Xlsx));
        assert_eq!(ExportFormat::parse(".pdf"), Some(ExportFormat::Pdf));
        assert!("csv".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_table_skips_id_column() {
        let mut store = Store::new();
        store.append(Transaction {
            kind: TransactionKind::Expense,
            amount: Amount::from_cents(12_000),
            category: "Custas".into(),
            ..Default::default()
        });

        let table = Table::for_kind(&store, EntityKind::Transaction);

        assert_eq!(table.title, "Financeiro");
        assert_eq!(table.headers[0], "Tipo");
        assert_eq!(table.headers.len(), EntityKind::Transaction.headers().len() - 1);
        assert_eq!(table.rows[0][0], "Despesa");
        assert_eq!(table.rows[0][2], "120.00");
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(EntityKind::Event, ExportFormat::Pdf), "agenda.pdf");
    }
}
