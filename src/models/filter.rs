//! Search and filter predicates over record collections.
//!
//! Filtering is pure: it never mutates the collection and keeps the original
//! order. All active predicates must hold (logical AND), so the order in
//! which they are checked does not change the result.

use super::{Case, Client, Document, Event, Task, Transaction};
use chrono::NaiveDate;

/// What a record exposes to the filter layer.
pub trait Searchable {
    /// Whether records of this type take part in due-date filtering.
    const DATED: bool = false;

    /// Fields matched by free-text search.
    fn search_fields(&self) -> Vec<&str>;

    /// Categorical value as `(key, label)`, if the record type has one.
    fn category(&self) -> Option<(&'static str, &'static str)> {
        None
    }

    /// Due date for date-cutoff filtering (tasks only).
    fn due_date(&self) -> Option<NaiveDate> {
        None
    }
}

impl Searchable for Client {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }
}

impl Searchable for Case {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.process_number.as_str(), self.client.as_str()]
    }

    fn category(&self) -> Option<(&'static str, &'static str)> {
        Some((self.status.as_str(), self.status.label()))
    }
}

impl Searchable for Task {
    const DATED: bool = true;

    fn search_fields(&self) -> Vec<&str> {
        vec![self.description.as_str()]
    }

    fn category(&self) -> Option<(&'static str, &'static str)> {
        Some((self.priority.as_str(), self.priority.label()))
    }

    fn due_date(&self) -> Option<NaiveDate> {
        self.due_on
    }
}

impl Searchable for Event {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.title.as_str()]
    }

    fn category(&self) -> Option<(&'static str, &'static str)> {
        Some((self.status.as_str(), self.status.label()))
    }
}

impl Searchable for Transaction {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.description.as_str(), self.category.as_str()]
    }

    fn category(&self) -> Option<(&'static str, &'static str)> {
        Some((self.payment.as_str(), self.payment.label()))
    }
}

impl Searchable for Document {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.title.as_str()]
    }
}

/// A set of predicates applied to one collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    /// Case-insensitive substring; empty matches everything
    pub text: String,
    /// Selected category; `None` means "All"
    pub category: Option<String>,
    /// Keep records due on or before this date (inactive when `None`)
    pub due_on_or_before: Option<NaiveDate>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Select a category. `All`, `Todos` and the empty string clear it.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        let category = category.into();
        self.category = if is_all(&category) {
            None
        } else {
            Some(category.trim().to_string())
        };
        self
    }

    pub fn with_due_cutoff(mut self, cutoff: NaiveDate) -> Self {
        self.due_on_or_before = Some(cutoff);
        self
    }

    /// True when no predicate is active.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.category.is_none() && self.due_on_or_before.is_none()
    }

    /// Check a single record against every active predicate.
    pub fn matches<T: Searchable>(&self, record: &T) -> bool {
        self.matches_text(record) && self.matches_category(record) && self.matches_due(record)
    }

    fn matches_text<T: Searchable>(&self, record: &T) -> bool {
        let needle = self.text.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        record
            .search_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }

    fn matches_category<T: Searchable>(&self, record: &T) -> bool {
        let Some(selected) = &self.category else {
            return true;
        };
        match record.category() {
            Some((key, label)) => {
                let selected = selected.to_lowercase();
                selected == key || selected == label.to_lowercase()
            }
            None => true,
        }
    }

    fn matches_due<T: Searchable>(&self, record: &T) -> bool {
        let Some(cutoff) = self.due_on_or_before else {
            return true;
        };
        match record.due_date() {
            Some(due) => due <= cutoff,
            None => !T::DATED,
        }
    }

    /// Apply the filter, returning `(position, record)` pairs in store order.
    ///
    /// Positions refer to the unfiltered collection so edit and delete
    /// actions taken from a filtered view address the right record.
    pub fn apply<'a, T: Searchable>(&self, records: &'a [T]) -> Vec<(usize, &'a T)> {
        records
            .iter()
            .enumerate()
            .filter(|(_, record)| self.matches(*record))
            .collect()
    }
}

fn is_all(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v.is_empty() || v == "all" || v == "todos" || v == "todas"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CaseStatus, Priority};

    fn case(number: &str, client: &str, status: CaseStatus) -> Case {
        Case {
            process_number: number.to_string(),
            client: client.to_string(),
            status,
            ..Default::default()
        }
    }

    fn positions<T>(hits: &[(usize, &T)]) -> Vec<usize> {
        hits.iter().map(|(i, _)| *i).collect()
    }

    #[test]
    fn test_text_search_matches_process_number_or_client() {
        let cases = vec![
            case("0001234-11", "Ana", CaseStatus::Open),
            case("999", "Bruno", CaseStatus::Open),
            case("555", "Cliente 123 Ltda", CaseStatus::Closed),
            case("777", "Dora", CaseStatus::Open),
        ];

        let hits = Filter::new().with_text("123").apply(&cases);
        assert_eq!(positions(&hits), vec![0, 2]);
    }

    #[test]
    fn test_text_search_is_case_insensitive() {
        let cases = vec![case("1", "Ana Souza", CaseStatus::Open), case("2", "Bruno", CaseStatus::Open)];
        let hits = Filter::new().with_text("SOUZA").apply(&cases);
        assert_eq!(positions(&hits), vec![0]);
    }

    #[test]
    fn test_empty_search_returns_everything_in_order() {
        let cases = vec![
            case("3", "C", CaseStatus::Open),
            case("1", "A", CaseStatus::Closed),
            case("2", "B", CaseStatus::Suspended),
        ];
        let hits = Filter::new().with_text("").apply(&cases);
        assert_eq!(positions(&hits), vec![0, 1, 2]);
        assert!(Filter::new().is_empty());
    }

    #[test]
    fn test_category_filter_by_key_or_label() {
        let cases = vec![
            case("1", "A", CaseStatus::Open),
            case("2", "B", CaseStatus::Closed),
            case("3", "C", CaseStatus::Open),
        ];
        assert_eq!(positions(&Filter::new().with_category("open").apply(&cases)), vec![0, 2]);
        assert_eq!(positions(&Filter::new().with_category("Fechado").apply(&cases)), vec![1]);
        assert_eq!(positions(&Filter::new().with_category("Todos").apply(&cases)), vec![0, 1, 2]);
        assert_eq!(positions(&Filter::new().with_category("All").apply(&cases)), vec![0, 1, 2]);
    }

    #[test]
    fn test_category_ignored_for_uncategorized_records() {
        let clients = vec![Client { name: "Ana".to_string(), ..Default::default() }];
        let hits = Filter::new().with_category("open").apply(&clients);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_due_cutoff_keeps_tasks_due_on_or_before() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 6, day);
        let tasks = vec![
            Task { description: "a".into(), due_on: d(1), ..Default::default() },
            Task { description: "b".into(), due_on: d(10), ..Default::default() },
            Task { description: "c".into(), due_on: d(11), ..Default::default() },
            Task { description: "d".into(), due_on: None, ..Default::default() },
        ];
        let hits = Filter::new().with_due_cutoff(d(10).unwrap()).apply(&tasks);
        assert_eq!(positions(&hits), vec![0, 1]);
    }

    #[test]
    fn test_predicates_combine_with_and() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 6, day);
        let tasks = vec![
            Task { description: "Petição inicial".into(), priority: Priority::High, due_on: d(1), ..Default::default() },
            Task { description: "Petição recurso".into(), priority: Priority::Low, due_on: d(2), ..Default::default() },
            Task { description: "Ligar cliente".into(), priority: Priority::High, due_on: d(3), ..Default::default() },
            Task { description: "Petição final".into(), priority: Priority::High, due_on: d(30), ..Default::default() },
        ];
        let filter = Filter::new()
            .with_text("petição")
            .with_category("Alta")
            .with_due_cutoff(d(15).unwrap());
        assert_eq!(positions(&filter.apply(&tasks)), vec![0]);
    }
}
