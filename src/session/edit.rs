//! Which form, if any, is open.

use crate::models::{EntityKind, Record};
use crate::storage::Store;
use serde::Serialize;

/// UI state shared by every page: at most one form is open at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UiState {
    /// No form open
    #[default]
    None,
    /// Blank create form for a record type
    Creating { kind: EntityKind },
    /// Pre-filled edit form for the record at `index`, remembered by `id`
    Editing {
        kind: EntityKind,
        index: usize,
        id: String,
    },
}

impl UiState {
    /// Open a blank form.
    pub fn begin_create(&mut self, kind: EntityKind) {
        *self = UiState::Creating { kind };
    }

    /// Open the edit form for `index`. Returns false when there is no
    /// record there, leaving the state untouched.
    pub fn begin_edit<T: Record>(&mut self, store: &Store, index: usize) -> bool {
        match store.get::<T>(index) {
            Some(record) => {
                *self = UiState::Editing {
                    kind: T::KIND,
                    index,
                    id: record.id().to_string(),
                };
                true
            }
            None => false,
        }
    }

    pub fn cancel(&mut self) {
        *self = UiState::None;
    }

    pub fn is_creating(&self, kind: EntityKind) -> bool {
        matches!(self, UiState::Creating { kind: k } if *k == kind)
    }

    /// Position being edited for `kind`, without checking staleness.
    pub fn editing(&self, kind: EntityKind) -> Option<usize> {
        match self {
            UiState::Editing { kind: k, index, .. } if *k == kind => Some(*index),
            _ => None,
        }
    }

    /// Check the open edit form for `T` against the store.
    ///
    /// Returns the index when the record is still there with the same id.
    /// A stale edit (index out of bounds, or a different record at that
    /// position) clears the state and returns `None`.
    pub fn resolve_edit<T: Record>(&mut self, store: &Store) -> Option<usize> {
        let UiState::Editing { kind, index, id } = self else {
            return None;
        };
        if *kind != T::KIND {
            return None;
        }
        let index = *index;
        let still_there = store.get::<T>(index).is_some_and(|record| record.id() == id);
        if still_there {
            Some(index)
        } else {
            self.cancel();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Case, Client};

    fn store_with(names: &[&str]) -> Store {
        let mut store = Store::new();
        for name in names {
            store.append(Client {
                name: name.to_string(),
                ..Default::default()
            });
        }
        store
    }

    #[test]
    fn test_begin_edit_out_of_bounds_keeps_state() {
        let store = store_with(&["Ana"]);
        let mut ui = UiState::default();
        assert!(!ui.begin_edit::<Client>(&store, 3));
        assert_eq!(ui, UiState::None);
    }

    #[test]
    fn test_only_one_form_open() {
        let store = store_with(&["Ana"]);
        let mut ui = UiState::default();
        ui.begin_create(EntityKind::Case);
        assert!(ui.is_creating(EntityKind::Case));

        assert!(ui.begin_edit::<Client>(&store, 0));
        assert!(!ui.is_creating(EntityKind::Case));
        assert_eq!(ui.editing(EntityKind::Client), Some(0));
    }

    #[test]
    fn test_resolve_edit_valid() {
        let store = store_with(&["Ana", "Bruno", "Carla"]);
        let mut ui = UiState::default();
        ui.begin_edit::<Client>(&store, 2);
        assert_eq!(ui.resolve_edit::<Client>(&store), Some(2));
        assert_eq!(ui.editing(EntityKind::Client), Some(2));
    }

    #[test]
    fn test_resolve_edit_clears_when_index_gone() {
        let mut store = store_with(&["Ana", "Bruno", "Carla"]);
        let mut ui = UiState::default();
        ui.begin_edit::<Client>(&store, 2);

        store.delete_at::<Client>(0);
        store.delete_at::<Client>(0);

        assert_eq!(ui.resolve_edit::<Client>(&store), None);
        assert_eq!(ui, UiState::None);
    }

    #[test]
    fn test_resolve_edit_clears_when_record_shifted() {
        let mut store = store_with(&["Ana", "Bruno", "Carla"]);
        let mut ui = UiState::default();
        ui.begin_edit::<Client>(&store, 1);

        store.delete_at::<Client>(0);

        assert_eq!(ui.resolve_edit::<Client>(&store), None);
        assert_eq!(ui, UiState::None);
    }

    #[test]
    fn test_resolve_edit_other_kind_is_untouched() {
        let store = store_with(&["Ana"]);
        let mut ui = UiState::default();
        ui.begin_edit::<Client>(&store, 0);
        assert_eq!(ui.resolve_edit::<Case>(&store), None);
        assert_eq!(ui.editing(EntityKind::Client), Some(0));
    }
}
