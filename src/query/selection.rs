//! Selection and bulk operations
//!
//! A [`Selection`] is the set of record identifiers marked for bulk action.
//! It is independent of filtering: a selected record stays selected while it
//! is filtered out of the view.
//!
//! Destructive bulk operations take an explicit [`Confirmation`]. Prompting
//! the user is the caller's job; a declined confirmation is a no-op.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::records::Record;

/// Identifiers of the selected records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    ids: BTreeSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Flip membership of `id`; returns whether it is now selected
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.to_string());
            true
        }
    }

    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.ids.remove(id)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drop identifiers for which `keep` returns false
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.ids.retain(|id| keep(id));
    }
}

impl<S: Into<String>> FromIterator<S> for Selection {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Symmetric difference of `selection` with `{id}`
pub fn toggle_selection(selection: &Selection, id: &str) -> Selection {
    let mut next = selection.clone();
    next.toggle(id);
    next
}

/// Outcome of the user's confirmation prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

impl Confirmation {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Confirmation::Confirmed)
    }
}

impl From<bool> for Confirmation {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            Confirmation::Confirmed
        } else {
            Confirmation::Declined
        }
    }
}

/// Result of a bulk operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOutcome {
    /// Confirmation was declined; nothing changed
    Declined,
    /// The operation touched this many records
    Applied(usize),
}

impl BulkOutcome {
    /// Records affected (zero when declined)
    pub fn affected(&self) -> usize {
        match self {
            BulkOutcome::Declined => 0,
            BulkOutcome::Applied(n) => *n,
        }
    }
}

/// Apply `transform` to every record whose identifier is selected
pub fn bulk_apply<R, F>(
    collection: &mut [R],
    selection: &Selection,
    confirmation: Confirmation,
    mut transform: F,
) -> BulkOutcome
where
    R: Record,
    F: FnMut(&mut R),
{
    if !confirmation.is_confirmed() {
        tracing::debug!(selected = selection.len(), "Bulk update declined");
        return BulkOutcome::Declined;
    }

    let mut applied = 0;
    for record in collection.iter_mut() {
        if selection.contains(record.id()) {
            transform(record);
            applied += 1;
        }
    }

    tracing::debug!(selected = selection.len(), applied, "Bulk update applied");
    BulkOutcome::Applied(applied)
}

/// Remove the records with the given identifiers, also unselecting them
pub fn remove_records<R: Record>(
    collection: &mut Vec<R>,
    selection: &mut Selection,
    ids: &[&str],
    confirmation: Confirmation,
) -> BulkOutcome {
    if !confirmation.is_confirmed() {
        return BulkOutcome::Declined;
    }

    let before = collection.len();
    collection.retain(|record| !ids.contains(&record.id()));
    for id in ids {
        selection.remove(id);
    }

    BulkOutcome::Applied(before - collection.len())
}
