//! The `Record` abstraction
//!
//! The query engine never looks at concrete domain types. It asks a record for
//! its identifier and for named fields, and gets back a [`FieldValue`].

use chrono::{DateTime, Utc};

/// A value read from a record field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    /// Single text value (names, emails, enum labels)
    Text(&'a str),
    /// Several text values (e.g. every line-item name of an order)
    TextList(Vec<&'a str>),
    /// Numeric value (amounts, quantities)
    Number(f64),
    /// Point in time
    Timestamp(DateTime<Utc>),
}

impl<'a> FieldValue<'a> {
    /// Numeric view of the value, if it is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text view of the value, if it is a single text value
    pub fn as_text(&self) -> Option<&'a str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Timestamp view of the value
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// All text values carried by this field (empty for non-text fields)
    pub fn texts(&self) -> Vec<&'a str> {
        match self {
            FieldValue::Text(s) => vec![*s],
            FieldValue::TextList(list) => list.clone(),
            _ => Vec::new(),
        }
    }
}

/// A domain entity held in a dashboard collection
///
/// Implementors expose a stable unique identifier and a set of named fields.
/// Nested values use dotted paths (`customer.name`, `items.name`).
pub trait Record {
    /// Stable unique identifier
    fn id(&self) -> &str;

    /// Read a named field, `None` when the record has no such field
    fn field(&self, name: &str) -> Option<FieldValue<'_>>;
}

/// Rows for delimited-text export
pub trait ExportRow {
    /// Column headers, in output order
    fn headers() -> &'static [&'static str];

    /// One row of cells, aligned with [`ExportRow::headers`]
    fn row(&self) -> Vec<String>;
}
