//! Storage layer for docket records.
//!
//! Records live in memory in a [`Store`], one ordered [`Collection`] per
//! record type. Position in the collection is how callers address a record;
//! each record also carries a surrogate id assigned on append.
//!
//! ## Persistence Backends
//!
//! Mutations are mirrored, best effort, to a [`PersistenceBackend`]:
//!
//! - **File backend** (default): JSONL files under `<data-dir>/sheets/`
//! - **Sheets backend**: a Google spreadsheet plus Drive folder for uploads
//! - **Proxy backend**: an HTTP endpoint speaking a small JSON protocol
//! - **Disabled**: nothing is mirrored
//!
//! Writes that fail are parked in the [`Outbox`] and retried later.

pub mod backend;
pub mod file;
pub mod outbox;
pub mod proxy;
pub mod sheets;

pub use backend::{BackendType, DisabledBackend, PersistenceBackend};
pub use file::FileBackend;
pub use outbox::{Outbox, PendingOp, PendingWrite};
pub use proxy::ProxyBackend;
pub use sheets::SheetsBackend;

use crate::models::{Case, Client, Document, Event, Record, Task, Transaction, generate_id};
use crate::{Error, Result};
use std::path::PathBuf;

/// Ordered records of one type.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    records: Vec<T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<T: Record> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record at the end and return its position.
    ///
    /// A record without an id receives a fresh one.
    pub fn append(&mut self, mut record: T) -> usize {
        if record.id().is_empty() {
            record.set_id(generate_id(T::KIND));
        }
        self.records.push(record);
        self.records.len() - 1
    }

    /// Replace the record at `index`, returning the previous one.
    ///
    /// The replacement keeps the id of the record it replaces. Returns
    /// `None` and changes nothing when `index` is out of bounds.
    pub fn replace_at(&mut self, index: usize, mut record: T) -> Option<T> {
        let slot = self.records.get_mut(index)?;
        record.set_id(slot.id().to_string());
        Some(std::mem::replace(slot, record))
    }

    /// Remove the record at `index`; later records shift down by one.
    ///
    /// Returns `None` and changes nothing when `index` is out of bounds.
    pub fn delete_at(&mut self, index: usize) -> Option<T> {
        if index < self.records.len() {
            Some(self.records.remove(index))
        } else {
            None
        }
    }

    pub fn all(&self) -> &[T] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.records.get(index)
    }

    /// Current position of the record with the given id.
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id() == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Cell values of every record, for mirroring a full sheet.
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.records.iter().map(Record::to_row).collect()
    }
}

/// All collections of one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    pub clients: Collection<Client>,
    pub cases: Collection<Case>,
    pub tasks: Collection<Task>,
    pub events: Collection<Event>,
    pub transactions: Collection<Transaction>,
    pub documents: Collection<Document>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when every collection is empty.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
            && self.cases.is_empty()
            && self.tasks.is_empty()
            && self.events.is_empty()
            && self.transactions.is_empty()
            && self.documents.is_empty()
    }

    pub fn clear(&mut self) {
        self.clients.clear();
        self.cases.clear();
        self.tasks.clear();
        self.events.clear();
        self.transactions.clear();
        self.documents.clear();
    }

    /// `append(entity_type, record)`.
    pub fn append<T: Record>(&mut self, record: T) -> usize {
        T::collection_mut(self).append(record)
    }

    /// `replace_at(entity_type, index, record)`.
    pub fn replace_at<T: Record>(&mut self, index: usize, record: T) -> Option<T> {
        T::collection_mut(self).replace_at(index, record)
    }

    /// `delete_at(entity_type, index)`.
    pub fn delete_at<T: Record>(&mut self, index: usize) -> Option<T> {
        T::collection_mut(self).delete_at(index)
    }

    /// `all(entity_type)`.
    pub fn all<T: Record>(&self) -> &[T] {
        T::collection(self).all()
    }

    pub fn get<T: Record>(&self, index: usize) -> Option<&T> {
        T::collection(self).get(index)
    }
}

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "DOCKET_DATA_DIR";

/// Resolve the data directory: explicit path > `DOCKET_DATA_DIR` > platform data dir.
pub fn resolve_data_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    dirs::data_dir()
        .map(|d| d.join("docket"))
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))
}
