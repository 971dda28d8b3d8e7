//! Collection filtering
//!
//! A [`FilterSpec`] is the set of filter constraints a panel currently has
//! active. Every dimension is optional; an absent dimension constrains
//! nothing. A record is in the view iff it satisfies all active dimensions.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::records::Record;

/// Value of an enum dimension that means "no constraint"
pub const ALL: &str = "all";

/// Which record fields each filter dimension reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterFields {
    /// Fields searched by the text dimension (any match succeeds)
    pub search: Vec<String>,
    pub status: String,
    pub priority: String,
    /// Field the min/max bounds apply to
    pub amount: String,
    /// Field the date range applies to
    pub date: String,
}

impl Default for FilterFields {
    fn default() -> Self {
        Self {
            search: vec![
                "id".to_string(),
                "customer.name".to_string(),
                "customer.email".to_string(),
                "items.name".to_string(),
            ],
            status: "status".to_string(),
            priority: "priority".to_string(),
            amount: "total".to_string(),
            date: "date".to_string(),
        }
    }
}

impl FilterFields {
    /// Replace the searchable fields
    pub fn searching(mut self, fields: &[&str]) -> Self {
        self.search = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Point the min/max bounds at another numeric field
    pub fn amount_field(mut self, field: impl Into<String>) -> Self {
        self.amount = field.into();
        self
    }
}

/// Closed interval of calendar days
///
/// Only active when both bounds are present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Range covering the `days` days ending at `today` (inclusive)
    ///
    /// None when the start would fall before the earliest representable date.
    pub fn last_days(today: NaiveDate, days: u32) -> Option<Self> {
        let start = today.checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))?;
        Some(Self::new(start, today))
    }

    /// The range of equal length immediately before this one
    ///
    /// None for an inactive or inverted range, or when the earlier range is
    /// out of the representable date span.
    pub fn previous(&self) -> Option<Self> {
        let (start, end) = (self.start?, self.end?);
        let span = u64::try_from((end - start).num_days()).ok()?;
        let prev_end = start.checked_sub_days(Days::new(1))?;
        let prev_start = prev_end.checked_sub_days(Days::new(span))?;
        Some(Self::new(prev_start, prev_end))
    }

    pub fn is_active(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    /// Whether the timestamp's calendar day lies within `[start, end]`.
    /// An inactive range contains everything.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => {
                let day = ts.date_naive();
                day >= start && day <= end
            }
            _ => true,
        }
    }
}

/// Active filter constraints of a panel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Case-insensitive substring searched across the searchable fields
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    /// Inclusive lower bound on the amount field
    #[serde(default)]
    pub min_amount: Option<f64>,
    /// Inclusive upper bound on the amount field
    #[serde(default)]
    pub max_amount: Option<f64>,
    #[serde(default)]
    pub date_range: DateRange,
}

impl FilterSpec {
    /// An empty spec (no constraints)
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: text search
    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    /// Builder: status (`"all"` clears it)
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Builder: priority (`"all"` clears it)
    pub fn priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    /// Builder: minimum amount
    pub fn min_amount(mut self, min: f64) -> Self {
        self.min_amount = Some(min);
        self
    }

    /// Builder: maximum amount
    pub fn max_amount(mut self, max: f64) -> Self {
        self.max_amount = Some(max);
        self
    }

    /// Builder: date range
    pub fn between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = DateRange::new(start, end);
        self
    }

    /// Reset every dimension
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// True when no dimension is active
    pub fn is_empty(&self) -> bool {
        self.active_search().is_none()
            && active_enum(&self.status).is_none()
            && active_enum(&self.priority).is_none()
            && self.min_amount.is_none()
            && self.max_amount.is_none()
            && !self.date_range.is_active()
    }

    /// Check a record against every active dimension
    pub fn matches<R: Record>(&self, record: &R, fields: &FilterFields) -> bool {
        self.matches_search(record, fields)
            && matches_enum(record, &fields.status, &self.status)
            && matches_enum(record, &fields.priority, &self.priority)
            && self.matches_amount(record, fields)
            && self.matches_date(record, fields)
    }

    /// Search text, unless blank; matched as typed
    fn active_search(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.trim().is_empty())
    }

    fn matches_search<R: Record>(&self, record: &R, fields: &FilterFields) -> bool {
        let needle = match self.active_search() {
            Some(needle) => needle.to_lowercase(),
            None => return true,
        };

        fields.search.iter().any(|name| {
            record
                .field(name)
                .map(|value| {
                    value
                        .texts()
                        .iter()
                        .any(|text| text.to_lowercase().contains(&needle))
                })
                .unwrap_or(false)
        })
    }

    fn matches_amount<R: Record>(&self, record: &R, fields: &FilterFields) -> bool {
        if self.min_amount.is_none() && self.max_amount.is_none() {
            return true;
        }

        let amount = match record.field(&fields.amount).and_then(|v| v.as_number()) {
            Some(amount) => amount,
            None => return false,
        };

        // min > max is left as is and simply matches nothing
        self.min_amount.map_or(true, |min| amount >= min)
            && self.max_amount.map_or(true, |max| amount <= max)
    }

    fn matches_date<R: Record>(&self, record: &R, fields: &FilterFields) -> bool {
        if !self.date_range.is_active() {
            return true;
        }

        record
            .field(&fields.date)
            .and_then(|v| v.as_timestamp())
            .map(|ts| self.date_range.contains(ts))
            .unwrap_or(false)
    }
}

fn active_enum(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(ALL))
}

fn matches_enum<R: Record>(record: &R, field: &str, wanted: &Option<String>) -> bool {
    let wanted = match active_enum(wanted) {
        Some(wanted) => wanted,
        None => return true,
    };

    record
        .field(field)
        .and_then(|v| v.as_text())
        .map(|actual| actual.eq_ignore_ascii_case(wanted))
        .unwrap_or(false)
}

/// Filter a collection with the default field mapping
///
/// The view preserves the collection's order.
pub fn apply_filter<'a, R: Record>(collection: &'a [R], spec: &FilterSpec) -> Vec<&'a R> {
    apply_filter_with(collection, spec, &FilterFields::default())
}

/// Filter a collection with an explicit field mapping
pub fn apply_filter_with<'a, R: Record>(
    collection: &'a [R],
    spec: &FilterSpec,
    fields: &FilterFields,
) -> Vec<&'a R> {
    if spec.is_empty() {
        return collection.iter().collect();
    }

    let view: Vec<&R> = collection
        .iter()
        .filter(|record| spec.matches(*record, fields))
        .collect();

    tracing::trace!(
        total = collection.len(),
        matched = view.len(),
        "Applied filter"
    );

    view
}
