//! Typed form fields shared by the CLI flags and the web forms.
//!
//! Each record type lists its editable fields once. Both surfaces read a
//! field's current text to pre-fill a form and write user text back through
//! [`Editable::set_field`], which is where enumeration, date and amount
//! parsing happens.

use super::{
    Amount, Case, CaseStatus, Client, Document, Event, EventKind, EventStatus, PaymentStatus,
    Priority, Record, Task, Transaction, TransactionKind, fmt_date, fmt_datetime, opt_str,
    parse_date, parse_datetime,
};
use crate::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};

/// Input widget a field needs.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Text,
    Multiline,
    Email,
    /// Closed enumeration; options are `(key, label)` pairs
    Choice(fn() -> Vec<(&'static str, &'static str)>),
    Date,
    DateTime,
    /// Non-negative, two decimals
    Amount,
}

/// One editable field of a record type.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Form and flag name
    pub key: &'static str,
    /// Column header used as display label
    pub label: &'static str,
    pub kind: FieldKind,
}

const fn field(key: &'static str, label: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { key, label, kind }
}

/// A record whose fields can be read and written as text.
pub trait Editable: Record + Default {
    const FIELDS: &'static [FieldSpec];

    /// Current value of `key` as form text.
    fn field(&self, key: &str) -> String;

    /// Parse `value` into field `key`.
    fn set_field(&mut self, key: &str, value: &str) -> Result<()>;

    fn field_spec(key: &str) -> Option<&'static FieldSpec> {
        Self::FIELDS.iter().find(|f| f.key == key)
    }
}

/// Write several fields, stopping at the first invalid value.
pub fn apply_fields<'a, T, I>(record: &mut T, values: I) -> Result<()>
where
    T: Editable,
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    for (key, value) in values {
        record.set_field(key, value)?;
    }
    Ok(())
}

fn unknown_field(kind: &str, key: &str) -> Error {
    Error::InvalidInput(format!("unknown {} field '{}'", kind, key))
}

fn text(value: &str) -> String {
    value.trim().to_string()
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn date(label: &str, value: &str) -> Result<Option<NaiveDate>> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    parse_date(value).map(Some).ok_or_else(|| {
        Error::InvalidInput(format!("invalid {} '{}' (expected YYYY-MM-DD)", label, value.trim()))
    })
}

fn datetime(label: &str, value: &str) -> Result<Option<NaiveDateTime>> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    parse_datetime(value).map(Some).ok_or_else(|| {
        Error::InvalidInput(format!(
            "invalid {} '{}' (expected YYYY-MM-DD HH:MM)",
            label,
            value.trim()
        ))
    })
}

fn amount(value: &str) -> Result<Amount> {
    if value.trim().is_empty() {
        return Ok(Amount::ZERO);
    }
    value.parse()
}

impl Editable for Client {
    const FIELDS: &'static [FieldSpec] = &[
        field("name", "Nome", FieldKind::Text),
        field("email", "Email", FieldKind::Email),
        field("phone", "Telefone", FieldKind::Text),
        field("notes", "Anotações", FieldKind::Multiline),
    ];

    fn field(&self, key: &str) -> String {
        match key {
            "name" => self.name.clone(),
            "email" => self.email.clone(),
            "phone" => self.phone.clone(),
            "notes" => self.notes.clone(),
            _ => String::new(),
        }
    }

    fn set_field(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "name" => self.name = text(value),
            "email" => self.email = text(value),
            "phone" => self.phone = text(value),
            "notes" => self.notes = value.trim_end().to_string(),
            _ => return Err(unknown_field("client", key)),
        }
        Ok(())
    }
}

impl Editable for Case {
    const FIELDS: &'static [FieldSpec] = &[
        field("client", "Cliente", FieldKind::Text),
        field("process_number", "Número do Processo", FieldKind::Text),
        field("parties", "Partes", FieldKind::Text),
        field("lawyer", "Advogado", FieldKind::Text),
        field("opened_on", "Data de Abertura", FieldKind::Date),
        field("status", "Status", FieldKind::Choice(CaseStatus::options)),
    ];

    fn field(&self, key: &str) -> String {
        match key {
            "client" => self.client.clone(),
            "process_number" => self.process_number.clone(),
            "parties" => self.parties.clone(),
            "lawyer" => self.lawyer.clone(),
            "opened_on" => fmt_date(self.opened_on),
            "status" => self.status.as_str().to_string(),
            _ => String::new(),
        }
    }

    fn set_field(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "client" => self.client = text(value),
            "process_number" => self.process_number = text(value),
            "parties" => self.parties = text(value),
            "lawyer" => self.lawyer = text(value),
            "opened_on" => self.opened_on = date("opening date", value)?,
            "status" => self.status = value.parse()?,
            _ => return Err(unknown_field("case", key)),
        }
        Ok(())
    }
}

impl Editable for Task {
    const FIELDS: &'static [FieldSpec] = &[
        field("description", "Descrição", FieldKind::Multiline),
        field("priority", "Prioridade", FieldKind::Choice(Priority::options)),
        field("due_on", "Prazo", FieldKind::Date),
        field("client", "Cliente", FieldKind::Text),
        field("case", "Caso", FieldKind::Text),
    ];

    fn field(&self, key: &str) -> String {
        match key {
            "description" => self.description.clone(),
            "priority" => self.priority.as_str().to_string(),
            "due_on" => fmt_date(self.due_on),
            "client" => opt_str(&self.client),
            "case" => opt_str(&self.case),
            _ => String::new(),
        }
    }

    fn set_field(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "description" => self.description = value.trim().to_string(),
            "priority" => self.priority = value.parse()?,
            "due_on" => self.due_on = date("due date", value)?,
            "client" => self.client = optional(value),
            "case" => self.case = optional(value),
            _ => return Err(unknown_field("task", key)),
        }
        Ok(())
    }
}

impl Editable for Event {
    const FIELDS: &'static [FieldSpec] = &[
        field("title", "Título", FieldKind::Text),
        field("kind", "Tipo", FieldKind::Choice(EventKind::options)),
        field("starts_at", "Data/Hora", FieldKind::DateTime),
        field("location", "Local", FieldKind::Text),
        field("client", "Cliente", FieldKind::Text),
        field("case", "Caso", FieldKind::Text),
        field("status", "Status", FieldKind::Choice(EventStatus::options)),
        field("description", "Descrição", FieldKind::Multiline),
    ];

    fn field(&self, key: &str) -> String {
        match key {
            "title" => self.title.clone(),
            "kind" => self.kind.as_str().to_string(),
            "starts_at" => fmt_datetime(self.starts_at),
            "location" => self.location.clone(),
            "client" => opt_str(&self.client),
            "case" => opt_str(&self.case),
            "status" => self.status.as_str().to_string(),
            "description" => self.description.clone(),
            _ => String::new(),
        }
    }

    fn set_field(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "title" => self.title = text(value),
            "kind" => self.kind = value.parse()?,
            "starts_at" => self.starts_at = datetime("date/time", value)?,
            "location" => self.location = text(value),
            "client" => self.client = optional(value),
            "case" => self.case = optional(value),
            "status" => self.status = value.parse()?,
            "description" => self.description = value.trim_end().to_string(),
            _ => return Err(unknown_field("event", key)),
        }
        Ok(())
    }
}

impl Editable for Transaction {
    const FIELDS: &'static [FieldSpec] = &[
        field("kind", "Tipo", FieldKind::Choice(TransactionKind::options)),
        field("category", "Categoria", FieldKind::Text),
        field("amount", "Valor", FieldKind::Amount),
        field("description", "Descrição", FieldKind::Text),
        field("date", "Data", FieldKind::Date),
        field("payment", "Status do Pagamento", FieldKind::Choice(PaymentStatus::options)),
        field("client", "Cliente", FieldKind::Text),
        field("case", "Caso", FieldKind::Text),
    ];

    fn field(&self, key: &str) -> String {
        match key {
            "kind" => self.kind.as_str().to_string(),
            "category" => self.category.clone(),
            "amount" => self.amount.to_string(),
            "description" => self.description.clone(),
            "date" => fmt_date(self.date),
            "payment" => self.payment.as_str().to_string(),
            "client" => opt_str(&self.client),
            "case" => opt_str(&self.case),
            _ => String::new(),
        }
    }

    fn set_field(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "kind" => self.kind = value.parse()?,
            "category" => self.category = text(value),
            "amount" => self.amount = amount(value)?,
            "description" => self.description = text(value),
            "date" => self.date = date("date", value)?,
            "payment" => self.payment = value.parse()?,
            "client" => self.client = optional(value),
            "case" => self.case = optional(value),
            _ => return Err(unknown_field("transaction", key)),
        }
        Ok(())
    }
}

impl Editable for Document {
    const FIELDS: &'static [FieldSpec] = &[
        field("client", "Cliente", FieldKind::Text),
        field("case", "Caso", FieldKind::Text),
        field("title", "Título", FieldKind::Text),
        field("file", "Arquivo", FieldKind::Text),
    ];

    fn field(&self, key: &str) -> String {
        match key {
            "client" => self.client.clone(),
            "case" => opt_str(&self.case),
            "title" => self.title.clone(),
            "file" => self.file.clone(),
            _ => String::new(),
        }
    }

    fn set_field(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "client" => self.client = text(value),
            "case" => self.case = optional(value),
            "title" => self.title = text(value),
            "file" => self.file = text(value),
            _ => return Err(unknown_field("document", key)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_round_trip_through_text() {
        let mut event = Event::default();
        apply_fields(
            &mut event,
            [
                ("title", "Audiência inicial"),
                ("kind", "Audiência"),
                ("starts_at", "2024-03-10T14:30"),
                ("status", "done"),
            ],
        )
        .unwrap();

        assert_eq!(event.kind, EventKind::Hearing);
        assert_eq!(event.status, EventStatus::Done);
        assert_eq!(event.field("starts_at"), "2024-03-10 14:30");
        assert_eq!(event.field("kind"), "hearing");
    }

    #[test]
    fn test_empty_optional_fields_clear() {
        let mut task = Task {
            client: Some("Ana".into()),
            due_on: parse_date("2024-01-01"),
            ..Default::default()
        };
        apply_fields(&mut task, [("client", "  "), ("due_on", "")]).unwrap();
        assert_eq!(task.client, None);
        assert_eq!(task.due_on, None);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut txn = Transaction::default();
        assert!(txn.set_field("amount", "-5").is_err());
        assert!(txn.set_field("amount", "abc").is_err());
        assert!(txn.set_field("kind", "refund").is_err());
        assert!(txn.set_field("date", "31/02/2024").is_err());
        assert!(txn.set_field("colour", "red").is_err());

        txn.set_field("amount", "R$ 1.234,50").unwrap();
        assert_eq!(txn.amount, Amount::from_cents(123_450));
    }

    #[test]
    fn test_apply_stops_at_first_error() {
        let mut case = Case::default();
        let result = apply_fields(
            &mut case,
            [("client", "Ana"), ("status", "archived"), ("lawyer", "Dr. B")],
        );
        assert!(result.is_err());
        assert_eq!(case.client, "Ana");
        assert_eq!(case.lawyer, "");
    }

    #[test]
    fn test_every_field_spec_is_settable() {
        fn check<T: Editable>() {
            let mut record = T::default();
            for spec in T::FIELDS {
                let value = record.field(spec.key);
                record.set_field(spec.key, &value).unwrap();
                assert!(T::field_spec(spec.key).is_some());
            }
        }
        check::<Client>();
        check::<Case>();
        check::<Task>();
        check::<Event>();
        check::<Transaction>();
        check::<Document>();
    }
}
