//! View ordering
//!
//! One active sort key at a time. Sorting is stable, so records whose sort
//! fields are equal or incomparable keep their relative (insertion) order.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::records::{FieldValue, Record};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortDirection::Ascending => write!(f, "asc"),
            SortDirection::Descending => write!(f, "desc"),
        }
    }
}

/// The active sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Column-header click: the same field flips direction, a new field
    /// starts ascending.
    pub fn toggle(current: Option<&SortSpec>, field: &str) -> SortSpec {
        match current {
            Some(spec) if spec.field == field => SortSpec {
                field: spec.field.clone(),
                direction: spec.direction.flip(),
            },
            _ => SortSpec::asc(field),
        }
    }
}

/// Sort a view by the given spec
///
/// The kind of the first usable value (number, text, timestamp) decides what
/// is comparable. Records whose value is missing or of another kind go last,
/// in insertion order, whatever the direction.
pub fn sort<'a, R: Record>(view: Vec<&'a R>, spec: &SortSpec) -> Vec<&'a R> {
    let mut decorated: Vec<(Option<FieldValue<'a>>, &'a R)> = view
        .into_iter()
        .map(|record| (record.field(&spec.field), record))
        .collect();

    let kind = decorated.iter().find_map(|(value, _)| value_kind(value.as_ref()));

    // slice::sort_by is stable
    decorated.sort_by(|(a, _), (b, _)| {
        let a_ok = kind.is_some() && value_kind(a.as_ref()) == kind;
        let b_ok = kind.is_some() && value_kind(b.as_ref()) == kind;
        match (a_ok, b_ok) {
            (true, true) => spec.direction.apply(compare_values(a.clone(), b.clone())),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => Ordering::Equal,
        }
    });

    decorated.into_iter().map(|(_, record)| record).collect()
}

/// Discriminant of a sortable value; NaN and empty lists are not sortable
fn value_kind(value: Option<&FieldValue<'_>>) -> Option<u8> {
    match value? {
        FieldValue::Number(n) if n.is_nan() => None,
        FieldValue::Number(_) => Some(0),
        FieldValue::Text(_) => Some(1),
        FieldValue::Timestamp(_) => Some(2),
        FieldValue::TextList(list) if list.is_empty() => None,
        FieldValue::TextList(_) => Some(3),
    }
}

/// Compare two field values; mismatched or missing values compare equal
pub fn compare_values(a: Option<FieldValue<'_>>, b: Option<FieldValue<'_>>) -> Ordering {
    match (a, b) {
        (Some(FieldValue::Number(x)), Some(FieldValue::Number(y))) => {
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(FieldValue::Text(x)), Some(FieldValue::Text(y))) => locale_cmp(x, y),
        (Some(FieldValue::Timestamp(x)), Some(FieldValue::Timestamp(y))) => x.cmp(&y),
        (Some(FieldValue::TextList(x)), Some(FieldValue::TextList(y))) => {
            match (x.first(), y.first()) {
                (Some(x), Some(y)) => locale_cmp(x, y),
                _ => Ordering::Equal,
            }
        }
        _ => Ordering::Equal,
    }
}

/// Case-insensitive comparison; among strings differing only in case,
/// lowercase sorts first.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));

    folded.then_with(|| b.cmp(a))
}
