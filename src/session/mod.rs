//! One user's working session.
//!
//! A [`Session`] owns the record store, the persistence backend, the outbox
//! and the UI state. The CLI builds one per invocation; the web server keeps
//! one behind a mutex. Every mutation is applied locally first and then
//! mirrored to the backend. Mirror failures never undo the local change:
//! they become warnings and the write waits in the outbox.

pub mod edit;

pub use edit::UiState;

use crate::config::{Credentials, ResolvedConfig};
use crate::models::{
    Case, Client, Document, EntityKind, Event, Record, Task, Transaction, to_row_map,
};
use crate::storage::sheets::ServiceAccountKey;
use crate::storage::{
    BackendType, DisabledBackend, FileBackend, Outbox, PendingOp, PendingWrite,
    PersistenceBackend, ProxyBackend, SheetsBackend, Store,
};
use crate::{Error, Result};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// A file attached while creating a document.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Build the backend selected by `config`.
///
/// A sheets or proxy backend missing what it needs degrades to a disabled
/// backend; the returned warning names what is missing.
pub fn connect(config: &ResolvedConfig) -> (Box<dyn PersistenceBackend>, Option<String>) {
    match config.backend.value {
        BackendType::File => (Box::new(FileBackend::new(&config.data_dir.value)), None),
        BackendType::Disabled => (Box::new(DisabledBackend::new("backend set to none")), None),
        BackendType::Proxy => match &config.proxy_url {
            Some(url) => {
                let token = config.proxy_token.as_ref().map(|t| t.value.clone());
                (Box::new(ProxyBackend::new(url.value.clone(), token)), None)
            }
            None => disabled("proxy backend needs DOCKET_PROXY_URL or proxy-url".to_string()),
        },
        BackendType::Sheets => {
            let key = match &config.credentials {
                Some(creds) => match &creds.value {
                    Credentials::Inline(json) => ServiceAccountKey::from_json(json),
                    Credentials::File(path) => ServiceAccountKey::from_file(path),
                },
                None => {
                    return disabled(
                        "sheets backend needs GOOGLE_CREDS or GOOGLE_CREDS_JSON".to_string(),
                    );
                }
            };
            match key {
                Ok(key) => (
                    Box::new(SheetsBackend::new(
                        key,
                        &config.spreadsheet.value,
                        &config.drive_root.value,
                    )),
                    None,
                ),
                Err(e) => disabled(e.to_string()),
            }
        }
    }
}

fn disabled(reason: String) -> (Box<dyn PersistenceBackend>, Option<String>) {
    (
        Box::new(DisabledBackend::new(reason.clone())),
        Some(format!("persistence disabled: {}", reason)),
    )
}

/// Application state for one user.
pub struct Session {
    store: Store,
    backend: Box<dyn PersistenceBackend>,
    outbox: Outbox,
    ui: UiState,
    warnings: Vec<String>,
    bootstrapped: bool,
    disabled_warned: bool,
}

impl Session {
    /// A session with an in-memory outbox.
    pub fn new(backend: Box<dyn PersistenceBackend>) -> Self {
        Self::with_outbox(backend, Outbox::in_memory())
    }

    pub fn with_outbox(backend: Box<dyn PersistenceBackend>, outbox: Outbox) -> Self {
        Self {
            store: Store::new(),
            backend,
            outbox,
            ui: UiState::None,
            warnings: Vec::new(),
            bootstrapped: false,
            disabled_warned: false,
        }
    }

    /// Open a session for a resolved configuration.
    ///
    /// The outbox is kept at `<data-dir>/outbox.json`.
    pub fn open(config: &ResolvedConfig) -> Result<Self> {
        let (backend, warning) = connect(config);
        let outbox = Outbox::open(&config.data_dir.value.join("outbox.json"))?;
        let mut session = Self::with_outbox(backend, outbox);
        if let Some(warning) = warning {
            session.warn(warning);
            session.disabled_warned = true;
        }
        Ok(session)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn backend(&self) -> &dyn PersistenceBackend {
        self.backend.as_ref()
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut UiState {
        &mut self.ui
    }

    /// Open the edit form for the record at `index`; false if there is none.
    pub fn begin_edit<T: Record>(&mut self, index: usize) -> bool {
        self.ui.begin_edit::<T>(&self.store, index)
    }

    /// Position of the record being edited, clearing a stale edit.
    pub fn resolve_edit<T: Record>(&mut self) -> Option<usize> {
        self.ui.resolve_edit::<T>(&self.store)
    }

    /// Warnings collected since the last call.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }

    /// Warn once per session that nothing is being persisted.
    fn note_disabled(&mut self) {
        if !self.disabled_warned {
            self.disabled_warned = true;
            let location = self.backend.location();
            self.warn(format!("changes are not persisted: {}", location));
        }
    }

    // === Bootstrap ===

    /// Load records from the backend once, when every collection is empty.
    ///
    /// Queued writes are flushed first. Whatever is still queued afterwards
    /// is reconciled into the loaded collections so pending local changes
    /// stay visible.
    pub fn bootstrap(&mut self) {
        if self.bootstrapped {
            return;
        }
        self.bootstrapped = true;

        if !self.backend.is_enabled() {
            self.note_disabled();
            return;
        }
        self.flush_outbox();
        if !self.store.is_empty() {
            return;
        }

        match self.load_all() {
            Ok(store) => {
                info!(
                    clients = store.clients.len(),
                    cases = store.cases.len(),
                    tasks = store.tasks.len(),
                    events = store.events.len(),
                    transactions = store.transactions.len(),
                    documents = store.documents.len(),
                    "loaded records"
                );
                self.store = store;
            }
            Err(e) => {
                self.warn(format!("could not load data from {}: {}", self.backend.location(), e));
            }
        }
        self.reconcile_outbox();
    }

    fn load_all(&mut self) -> Result<Store> {
        let mut store = Store::new();
        let mut warnings = Vec::new();
        self.load_kind::<Client>(&mut store, &mut warnings)?;
        self.load_kind::<Case>(&mut store, &mut warnings)?;
        self.load_kind::<Task>(&mut store, &mut warnings)?;
        self.load_kind::<Event>(&mut store, &mut warnings)?;
        self.load_kind::<Transaction>(&mut store, &mut warnings)?;
        self.load_kind::<Document>(&mut store, &mut warnings)?;
        for warning in warnings {
            self.warn(warning);
        }
        Ok(store)
    }

    fn load_kind<T: Record>(&mut self, store: &mut Store, warnings: &mut Vec<String>) -> Result<()> {
        let rows = self.backend.load_rows(T::KIND.sheet_name())?;
        for row in &rows {
            store.append(T::from_row(row, warnings));
        }
        Ok(())
    }

    fn reconcile_outbox(&mut self) {
        if self.outbox.is_empty() {
            return;
        }
        let mut warnings = Vec::new();
        self.reconcile_kind::<Client>(&mut warnings);
        self.reconcile_kind::<Case>(&mut warnings);
        self.reconcile_kind::<Task>(&mut warnings);
        self.reconcile_kind::<Event>(&mut warnings);
        self.reconcile_kind::<Transaction>(&mut warnings);
        self.reconcile_kind::<Document>(&mut warnings);
        for warning in warnings {
            self.warn(warning);
        }
        let pending = self.outbox.len();
        self.warn(format!("{} change(s) waiting to be written to the backend", pending));
    }

    fn reconcile_kind<T: Record>(&mut self, warnings: &mut Vec<String>) {
        let sheet = T::KIND.sheet_name();
        let to_records = |write: &PendingWrite, warnings: &mut Vec<String>| -> Vec<T> {
            crate::storage::backend::rows_to_maps(&write.header, &write.rows)
                .iter()
                .map(|row| T::from_row(row, warnings))
                .collect()
        };

        if let Some(replace) = self.outbox.pending_replace(sheet) {
            let records = to_records(replace, warnings);
            let collection = T::collection_mut(&mut self.store);
            collection.clear();
            for record in records {
                collection.append(record);
            }
        }

        let appends: Vec<T> = self
            .outbox
            .pending_appends(sheet)
            .into_iter()
            .flat_map(|write| to_records(write, warnings))
            .collect();
        let mut known: HashSet<String> = T::collection(&self.store)
            .all()
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        for record in appends {
            if record.id().is_empty() || known.insert(record.id().to_string()) {
                self.store.append(record);
            }
        }
    }

    // === Mirroring ===

    /// Send queued writes; report what is still pending.
    pub fn flush_outbox(&mut self) -> usize {
        if self.outbox.is_empty() {
            return 0;
        }
        let report = self.outbox.flush(self.backend.as_mut());
        if report.sent > 0 {
            info!(sent = report.sent, "flushed pending writes");
        }
        if let Some(error) = report.error {
            self.warn(format!(
                "{} pending write(s) still failing: {}",
                report.remaining, error
            ));
        }
        report.remaining
    }

    fn mirror(&mut self, write: PendingWrite) {
        if !self.backend.is_enabled() {
            self.note_disabled();
            return;
        }
        if self.flush_outbox() > 0 {
            // keep order behind the writes that are still failing
            if let Err(e) = self.outbox.push(write, "queued behind earlier pending writes") {
                self.warn(format!("could not save outbox: {}", e));
            }
            return;
        }

        let header: Vec<&str> = write.header.iter().map(String::as_str).collect();
        let result = match write.op {
            PendingOp::Append => self.backend.append_rows(&write.sheet, &header, &write.rows),
            PendingOp::Replace => self.backend.replace_rows(&write.sheet, &header, &write.rows),
        };
        match result {
            Ok(()) => debug!(sheet = %write.sheet, op = ?write.op, "mirrored"),
            Err(e) => {
                self.warn(format!(
                    "could not save to {} ({}); will retry",
                    write.sheet, e
                ));
                if let Err(e) = self.outbox.push(write, &e.to_string()) {
                    self.warn(format!("could not save outbox: {}", e));
                }
            }
        }
    }

    fn mirror_append<T: Record>(&mut self, record: &T) {
        let write = PendingWrite::new(
            PendingOp::Append,
            T::KIND.sheet_name(),
            T::KIND.headers(),
            vec![record.to_row()],
        );
        self.mirror(write);
    }

    fn mirror_sheet<T: Record>(&mut self) {
        let rows = T::collection(&self.store).rows();
        let write = PendingWrite::new(PendingOp::Replace, T::KIND.sheet_name(), T::KIND.headers(), rows);
        self.mirror(write);
    }

    // === Actions ===

    /// Append a record and mirror it. Returns its position.
    pub fn create<T: Record>(&mut self, record: T) -> usize {
        let index = self.store.append(record);
        if self.ui.is_creating(T::KIND) {
            self.ui.cancel();
        }
        if let Some(record) = self.store.get::<T>(index).cloned() {
            debug!(kind = %T::KIND, row = ?to_row_map(&record), "created");
            self.mirror_append(&record);
        }
        index
    }

    /// Replace the record at `index` and mirror the sheet.
    pub fn update<T: Record>(&mut self, index: usize, record: T) -> Result<T> {
        let previous = self
            .store
            .replace_at(index, record)
            .ok_or(Error::StaleIndex(index))?;
        self.mirror_sheet::<T>();
        Ok(previous)
    }

    /// Save the open edit form for `T`.
    ///
    /// Returns the saved position, or `None` when the edit went stale; the
    /// edit state is cleared in both cases and nothing is written for a
    /// stale edit.
    pub fn save_edit<T: Record>(&mut self, record: T) -> Result<Option<usize>> {
        let Some(index) = self.ui.resolve_edit::<T>(&self.store) else {
            return Ok(None);
        };
        self.update(index, record)?;
        self.ui.cancel();
        Ok(Some(index))
    }

    /// Remove the record at `index` and mirror the sheet.
    pub fn delete<T: Record>(&mut self, index: usize) -> Result<T> {
        let removed = self
            .store
            .delete_at::<T>(index)
            .ok_or(Error::StaleIndex(index))?;
        // a form pointing at a shifted record is no longer valid
        self.ui.resolve_edit::<T>(&self.store);
        self.mirror_sheet::<T>();
        Ok(removed)
    }

    /// Create a document, uploading its file first when one is given.
    ///
    /// A failed upload keeps the document with the bare file name.
    pub fn attach_document(&mut self, mut document: Document, upload: Option<Upload>) -> usize {
        if let Some(upload) = upload {
            if !self.backend.is_enabled() {
                self.note_disabled();
                document.file = upload.filename;
            } else {
                let owner = if document.client.trim().is_empty() {
                    "Sem cliente".to_string()
                } else {
                    document.client.clone()
                };
                match self.backend.upload_file(&upload.bytes, &upload.filename, &owner) {
                    Ok(link) => document.file = link,
                    Err(e) => {
                        self.warn(format!("could not upload {}: {}", upload.filename, e));
                        document.file = upload.filename;
                    }
                }
            }
        }
        self.create(document)
    }

    /// Dispatch by record type name, for callers that only know the kind.
    pub fn delete_kind(&mut self, kind: EntityKind, index: usize) -> Result<String> {
        match kind {
            EntityKind::Client => self.delete::<Client>(index).map(|r| r.summary()),
            EntityKind::Case => self.delete::<Case>(index).map(|r| r.summary()),
            EntityKind::Task => self.delete::<Task>(index).map(|r| r.summary()),
            EntityKind::Event => self.delete::<Event>(index).map(|r| r.summary()),
            EntityKind::Transaction => self.delete::<Transaction>(index).map(|r| r.summary()),
            EntityKind::Document => self.delete::<Document>(index).map(|r| r.summary()),
        }
    }
}
