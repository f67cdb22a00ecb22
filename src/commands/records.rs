//! Create, list, edit and remove records of any kind.

use super::{Output, json};
use crate::models::{Document, EntityKind, Editable, Filter, Record, Searchable, apply_fields};
use crate::session::{Session, Upload};
use crate::{Error, Result};
use serde::Serialize;
use std::path::Path;

/// A record with its position in the collection.
#[derive(Debug, Clone, Serialize)]
pub struct Indexed<T> {
    pub index: usize,
    #[serde(flatten)]
    pub record: T,
}

/// Field values given on the command line, by field key.
pub type FieldValues = Vec<(&'static str, String)>;

fn field_pairs(fields: &FieldValues) -> impl Iterator<Item = (&str, &str)> {
    fields.iter().map(|(k, v)| (*k, v.as_str()))
}

#[derive(Debug, Serialize)]
pub struct RecordAdded<T> {
    pub kind: EntityKind,
    pub index: usize,
    pub record: T,
}

impl<T: Record> Output for RecordAdded<T> {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Created {} #{} ({}): {}",
            self.kind,
            self.index,
            self.record.id(),
            self.record.summary()
        )
    }
}

/// Create a record from field values.
pub fn add<T: Editable>(session: &mut Session, fields: &FieldValues) -> Result<RecordAdded<T>> {
    let mut record = T::default();
    apply_fields(&mut record, field_pairs(fields))?;
    session.ui_mut().begin_create(T::KIND);
    let index = session.create(record);
    added(session, index)
}

/// Create a document, uploading `file` to the backend when given.
pub fn add_document(
    session: &mut Session,
    fields: &FieldValues,
    file: Option<&Path>,
) -> Result<RecordAdded<Document>> {
    let mut document = Document::default();
    apply_fields(&mut document, field_pairs(fields))?;
    let upload = match file {
        Some(path) => {
            let bytes = std::fs::read(path).map_err(|e| {
                Error::InvalidInput(format!("cannot read {}: {}", path.display(), e))
            })?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "arquivo".to_string());
            Some(Upload { filename, bytes })
        }
        None => None,
    };
    let index = session.attach_document(document, upload);
    added(session, index)
}

fn added<T: Record>(session: &Session, index: usize) -> Result<RecordAdded<T>> {
    let record = session
        .store()
        .get::<T>(index)
        .cloned()
        .ok_or(Error::StaleIndex(index))?;
    Ok(RecordAdded {
        kind: T::KIND,
        index,
        record,
    })
}

#[derive(Serialize)]
pub struct RecordList<T> {
    pub kind: EntityKind,
    pub count: usize,
    pub total: usize,
    pub items: Vec<Indexed<T>>,
}

impl<T: Record> Output for RecordList<T> {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.items.is_empty() {
            return format!("No {} found.", self.kind.plural());
        }
        let mut lines = vec![if self.count == self.total {
            format!("{} {}:", self.count, self.kind.plural())
        } else {
            format!("{} of {} {}:", self.count, self.total, self.kind.plural())
        }];
        for item in &self.items {
            lines.push(format!("  #{} {}", item.index, item.record.summary()));
        }
        lines.join("\n")
    }
}

/// Filtered view of one collection. Indexes refer to the full collection.
pub fn list<T: Record + Searchable>(session: &Session, filter: &Filter) -> RecordList<T> {
    let all = session.store().all::<T>();
    let items: Vec<Indexed<T>> = filter
        .apply(all)
        .into_iter()
        .map(|(index, record)| Indexed {
            index,
            record: record.clone(),
        })
        .collect();
    RecordList {
        kind: T::KIND,
        count: items.len(),
        total: all.len(),
        items,
    }
}

#[derive(Debug, Serialize)]
pub struct RecordUpdated<T> {
    pub kind: EntityKind,
    pub index: usize,
    pub previous: T,
    pub record: T,
}

impl<T: Record> Output for RecordUpdated<T> {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Updated {} #{}: {}",
            self.kind,
            self.index,
            self.record.summary()
        )
    }
}

/// Change the given fields of the record at `index`.
///
/// Goes through the edit tracker like the web form does: the edit is opened,
/// the fields are parsed, and the save is refused if the record moved.
pub fn edit<T: Editable>(
    session: &mut Session,
    index: usize,
    fields: &FieldValues,
) -> Result<RecordUpdated<T>> {
    if fields.is_empty() {
        return Err(Error::InvalidInput(format!(
            "nothing to change for {} #{}",
            T::KIND,
            index
        )));
    }
    if !session.begin_edit::<T>(index) {
        return Err(Error::StaleIndex(index));
    }
    let current = session
        .store()
        .get::<T>(index)
        .cloned()
        .ok_or(Error::StaleIndex(index))?;
    let previous = current.clone();
    let mut record = current;
    if let Err(e) = apply_fields(&mut record, field_pairs(fields)) {
        session.ui_mut().cancel();
        return Err(e);
    }
    let index = session
        .save_edit(record)?
        .ok_or(Error::StaleIndex(index))?;
    let record = session
        .store()
        .get::<T>(index)
        .cloned()
        .ok_or(Error::StaleIndex(index))?;
    Ok(RecordUpdated {
        kind: T::KIND,
        index,
        previous,
        record,
    })
}

#[derive(Debug, Serialize)]
pub struct RecordRemoved<T> {
    pub kind: EntityKind,
    pub index: usize,
    pub record: T,
}

impl<T: Record> Output for RecordRemoved<T> {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Removed {} #{}: {}",
            self.kind,
            self.index,
            self.record.summary()
        )
    }
}

/// Delete the record at `index`; later records move up by one.
pub fn remove<T: Record>(session: &mut Session, index: usize) -> Result<RecordRemoved<T>> {
    let record = session.delete::<T>(index)?;
    Ok(RecordRemoved {
        kind: T::KIND,
        index,
        record,
    })
}
