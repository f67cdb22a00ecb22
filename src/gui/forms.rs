//! Record forms: rendering from field specs and parsing submitted values.

use super::html::{escape, options};
use crate::models::{Editable, FieldKind, apply_fields};
use std::collections::HashMap;
use std::fmt;

/// Submitted form fields by name.
pub type FormValues = HashMap<String, String>;

/// A form that could not be saved, kept with what the user typed.
#[derive(Debug, Clone)]
pub struct FormError {
    pub message: String,
    pub values: FormValues,
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for FormError {}

/// Form values pre-filled from an existing record.
pub fn values_of<T: Editable>(record: &T) -> FormValues {
    T::FIELDS
        .iter()
        .map(|spec| (spec.key.to_string(), record.field(spec.key)))
        .collect()
}

/// Apply the submitted values of every known field onto `base`.
///
/// Fields missing from the submission keep their value in `base`.
pub fn parse_record<T: Editable>(mut base: T, values: &FormValues) -> Result<T, FormError> {
    let submitted = T::FIELDS
        .iter()
        .filter_map(|spec| values.get(spec.key).map(|v| (spec.key, v.as_str())));
    match apply_fields(&mut base, submitted) {
        Ok(()) => Ok(base),
        Err(e) => Err(FormError {
            message: e.to_string(),
            values: values.clone(),
        }),
    }
}

fn input(spec_key: &str, kind: FieldKind, value: &str) -> String {
    let name = escape(spec_key);
    let value_attr = escape(value);
    match kind {
        FieldKind::Text => format!(r#"<input type="text" name="{}" value="{}">"#, name, value_attr),
        FieldKind::Email => format!(r#"<input type="email" name="{}" value="{}">"#, name, value_attr),
        FieldKind::Multiline => format!(
            r#"<textarea name="{}" rows="3">{}</textarea>"#,
            name,
            escape(value)
        ),
        FieldKind::Choice(choices) => format!(
            r#"<select name="{}">{}</select>"#,
            name,
            options(&choices(), value)
        ),
        FieldKind::Date => format!(r#"<input type="date" name="{}" value="{}">"#, name, value_attr),
        FieldKind::DateTime => format!(
            r#"<input type="datetime-local" name="{}" value="{}">"#,
            name,
            escape(&value.replacen(' ', "T", 1))
        ),
        FieldKind::Amount => format!(
            r#"<input type="number" name="{}" value="{}" min="0" step="0.01">"#,
            name, value_attr
        ),
    }
}

/// Render the create or edit form for `T`.
///
/// `editing` is the position being edited, `None` for a create form.
/// `with_upload` adds a file input and posts multipart to the upload route.
pub fn render<T: Editable>(
    values: &FormValues,
    editing: Option<usize>,
    error: Option<&str>,
    with_upload: bool,
) -> String {
    let kind = T::KIND;
    let heading = match editing {
        Some(index) => format!("Editar {} #{}", kind.label(), index),
        None => format!("Adicionar {}", kind.label()),
    };
    let target = if with_upload {
        format!(
            r#"action="/records/{}/upload" enctype="multipart/form-data""#,
            kind.plural()
        )
    } else {
        format!(r#"action="/records/{}""#, kind.plural())
    };
    let mut out = format!(
        r#"<form class="record" method="post" {}><h2>{}</h2>"#,
        target,
        escape(&heading)
    );
    if let Some(error) = error {
        out.push_str(&format!(r#"<div class="flash error">{}</div>"#, escape(error)));
    }
    for spec in T::FIELDS {
        let value = values.get(spec.key).map(String::as_str).unwrap_or("");
        out.push_str(&format!(
            "<label>{}</label>{}",
            escape(spec.label),
            input(spec.key, spec.kind, value)
        ));
    }
    if with_upload && editing.is_none() {
        out.push_str(r#"<label>Enviar arquivo</label><input type="file" name="upload">"#);
    }
    out.push_str(r#"<p><button type="submit">Salvar</button> "#);
    out.push_str(&format!(
        r#"<button class="secondary" type="submit" formaction="/records/{}/cancel">Cancelar</button></p></form>"#,
        kind.plural()
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Case, CaseStatus, Event, Transaction};

    fn form(pairs: &[(&str, &str)]) -> FormValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_record_keeps_unsubmitted_fields() {
        let base = Case {
            client: "Ana".into(),
            lawyer: "Dr. B".into(),
            ..Default::default()
        };
        let case = parse_record(base, &form(&[("status", "closed"), ("lawyer", "Dra. C")])).unwrap();
        assert_eq!(case.client, "Ana");
        assert_eq!(case.lawyer, "Dra. C");
        assert_eq!(case.status, CaseStatus::Closed);
    }

    #[test]
    fn test_parse_error_keeps_entered_values() {
        let values = form(&[("amount", "-10"), ("category", "Custas")]);
        let err = parse_record(Transaction::default(), &values).unwrap_err();
        assert!(err.message.contains("negative"));
        assert_eq!(err.values.get("category").map(String::as_str), Some("Custas"));
    }

    #[test]
    fn test_render_prefills_values() {
        let event = Event {
            title: "Audiência <inicial>".into(),
            starts_at: crate::models::parse_datetime("2024-03-10 14:30"),
            ..Default::default()
        };
        let html = render::<Event>(&values_of(&event), Some(2), None, false);
        assert!(html.contains("Editar Evento #2"));
        assert!(html.contains(r#"value="Audiência &lt;inicial&gt;""#));
        assert!(html.contains(r#"value="2024-03-10T14:30""#));
        assert!(html.contains(r#"action="/records/events""#));
        assert!(!html.contains("multipart"));
    }

    #[test]
    fn test_render_document_form_has_upload() {
        let html = render::<crate::models::Document>(&FormValues::new(), None, Some("erro"), true);
        assert!(html.contains("Adicionar Documento"));
        assert!(html.contains(r#"action="/records/documents/upload" enctype="multipart/form-data""#));
        assert!(html.contains(r#"type="file" name="upload""#));
        assert!(html.contains(r#"<div class="flash error">erro</div>"#));
    }
}
