//! Panel state
//!
//! A [`Panel`] owns what a dashboard panel holds between renders: the
//! canonical collection, the active filter and sort, and the selection.
//! The view is recomputed from those on every call to [`Panel::view`].

use super::filter::{apply_filter_with, FilterFields, FilterSpec};
use super::selection::{bulk_apply, BulkOutcome, Confirmation, Selection};
use super::sort::{sort, SortSpec};
use super::stats::{compute_stats_with, StatsConfig, StatsSummary};
use crate::records::Record;

/// State of one collection panel (orders, transactions, revenue)
#[derive(Debug, Clone)]
pub struct Panel<R> {
    records: Vec<R>,
    filter: FilterSpec,
    fields: FilterFields,
    sort: Option<SortSpec>,
    selection: Selection,
    stats_config: StatsConfig,
    max_len: Option<usize>,
}

impl<R: Record> Panel<R> {
    /// Mount a panel over its initial collection
    pub fn new(records: Vec<R>) -> Self {
        Self {
            records,
            filter: FilterSpec::default(),
            fields: FilterFields::default(),
            sort: None,
            selection: Selection::default(),
            stats_config: StatsConfig::default(),
            max_len: None,
        }
    }

    /// Builder: field mapping for the filter dimensions
    pub fn with_fields(mut self, fields: FilterFields) -> Self {
        self.fields = fields;
        self
    }

    /// Builder: field mapping for the stats
    pub fn with_stats_config(mut self, config: StatsConfig) -> Self {
        self.stats_config = config;
        self
    }

    /// Builder: keep at most `max_len` records (live arrivals push old ones out)
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = Some(max_len);
        self.enforce_max_len();
        self
    }

    /// Canonical collection, unfiltered
    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&R> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn filter(&self) -> &FilterSpec {
        &self.filter
    }

    /// Mutable access to the filter, for editing single dimensions
    pub fn filter_mut(&mut self) -> &mut FilterSpec {
        &mut self.filter
    }

    pub fn set_filter(&mut self, filter: FilterSpec) {
        self.filter = filter;
    }

    pub fn clear_filters(&mut self) {
        self.filter.clear();
    }

    pub fn sort_spec(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    pub fn set_sort(&mut self, sort: Option<SortSpec>) {
        self.sort = sort;
    }

    /// Column-header click
    pub fn toggle_sort(&mut self, field: &str) -> &SortSpec {
        let next = SortSpec::toggle(self.sort.as_ref(), field);
        self.sort.insert(next)
    }

    /// Filtered and sorted view of the collection
    pub fn view(&self) -> Vec<&R> {
        let view = apply_filter_with(&self.records, &self.filter, &self.fields);
        match &self.sort {
            Some(spec) => sort(view, spec),
            None => view,
        }
    }

    /// Dashboard stats over the whole collection; narrowing the filter does
    /// not move these numbers.
    pub fn stats(&self) -> StatsSummary {
        compute_stats_with(self.records.iter(), &self.stats_config)
    }

    /// Stats over the current view, for features that aggregate what is shown
    pub fn filtered_stats(&self) -> StatsSummary {
        compute_stats_with(self.view(), &self.stats_config)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Toggle selection of a record. Unknown identifiers are ignored.
    /// Returns whether the record is now selected.
    pub fn toggle_selection(&mut self, id: &str) -> bool {
        if !self.selection.contains(id) && self.get(id).is_none() {
            tracing::debug!(id = %id, "Ignoring selection of unknown record");
            return false;
        }
        self.selection.toggle(id)
    }

    /// Select every record currently in the view
    pub fn select_all_visible(&mut self) {
        let ids: Vec<String> = self.view().iter().map(|r| r.id().to_string()).collect();
        for id in ids {
            self.selection.insert(id);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Apply `transform` to every selected record
    pub fn bulk_apply<F>(&mut self, confirmation: Confirmation, transform: F) -> BulkOutcome
    where
        F: FnMut(&mut R),
    {
        bulk_apply(&mut self.records, &self.selection, confirmation, transform)
    }

    /// Update one record in place; returns false if it does not exist
    pub fn update<F>(&mut self, id: &str, transform: F) -> bool
    where
        F: FnOnce(&mut R),
    {
        match self.records.iter_mut().find(|r| r.id() == id) {
            Some(record) => {
                transform(record);
                true
            }
            None => false,
        }
    }

    /// Delete records; their identifiers leave the selection too
    pub fn remove(&mut self, ids: &[&str], confirmation: Confirmation) -> BulkOutcome {
        super::selection::remove_records(&mut self.records, &mut self.selection, ids, confirmation)
    }

    /// Delete every selected record
    pub fn remove_selected(&mut self, confirmation: Confirmation) -> BulkOutcome {
        let selected: Vec<String> = self.selection.iter().map(str::to_string).collect();
        let ids: Vec<&str> = selected.iter().map(String::as_str).collect();
        self.remove(&ids, confirmation)
    }

    /// Put a live arrival at the head of the collection
    ///
    /// A record with the same identifier is replaced. With a length limit,
    /// the oldest records fall off the end.
    pub fn prepend_live(&mut self, record: R) {
        let id = record.id().to_string();
        self.records.retain(|r| r.id() != id);
        self.records.insert(0, record);
        self.enforce_max_len();
    }

    fn enforce_max_len(&mut self) {
        if let Some(max) = self.max_len {
            if self.records.len() > max {
                self.records.truncate(max);
                let records = &self.records;
                self.selection
                    .retain(|id| records.iter().any(|r| r.id() == id));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{LineItem, Order, OrderStatus, Priority};
    use chrono::{TimeZone, Utc};

    fn order(id: &str, name: &str, total: f64, status: OrderStatus) -> Order {
        Order::new(
            id,
            name,
            "c@example.com",
            vec![LineItem::new("Item", 1, total)],
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
        .status(status)
    }

    fn panel() -> Panel<Order> {
        Panel::new(vec![
            order("A", "Zed", 100.0, OrderStatus::Delivered),
            order("B", "Amy", 50.0, OrderStatus::Cancelled),
            order("C", "Kim", 75.0, OrderStatus::Pending),
        ])
    }

    fn ids(view: &[&Order]) -> Vec<String> {
        view.iter().map(|o| o.id.clone()).collect()
    }

    #[test]
    fn test_stats_ignore_filter() {
        let mut panel = panel();
        let before = panel.stats();
        panel.set_filter(FilterSpec::new().status("pending"));

        assert_eq!(panel.view().len(), 1);
        assert_eq!(panel.stats(), before);
        assert_eq!(panel.filtered_stats().revenue, 75.0);
        assert_eq!(before.revenue, 175.0);
    }

    #[test]
    fn test_toggle_sort_and_view() {
        let mut panel = panel();
        panel.toggle_sort("customer.name");
        assert_eq!(ids(&panel.view()), vec!["B", "C", "A"]);

        panel.toggle_sort("customer.name");
        assert_eq!(ids(&panel.view()), vec!["A", "C", "B"]);

        let spec = panel.toggle_sort("total").clone();
        assert_eq!(spec, SortSpec::asc("total"));
        assert_eq!(ids(&panel.view()), vec!["B", "C", "A"]);
    }

    #[test]
    fn test_selection_survives_filtering() {
        let mut panel = panel();
        assert!(panel.toggle_selection("B"));
        panel.set_filter(FilterSpec::new().status("delivered"));
        assert_eq!(ids(&panel.view()), vec!["A"]);
        assert!(panel.selection().contains("B"));
    }

    #[test]
    fn test_unknown_id_not_selected() {
        let mut panel = panel();
        assert!(!panel.toggle_selection("nope"));
        assert!(panel.selection().is_empty());
    }

    #[test]
    fn test_select_all_visible_and_bulk_update() {
        let mut panel = panel();
        panel.set_filter(FilterSpec::new().max_amount(80.0));
        panel.select_all_visible();
        assert_eq!(panel.selection().len(), 2);

        let outcome = panel.bulk_apply(Confirmation::Confirmed, |o| o.priority = Priority::Urgent);
        assert_eq!(outcome, BulkOutcome::Applied(2));
        assert_eq!(panel.get("A").unwrap().priority, Priority::Medium);
        assert_eq!(panel.get("B").unwrap().priority, Priority::Urgent);
    }

    #[test]
    fn test_remove_selected_clears_selection() {
        let mut panel = panel();
        panel.toggle_selection("A");
        panel.toggle_selection("C");

        assert_eq!(panel.remove_selected(Confirmation::Declined), BulkOutcome::Declined);
        assert_eq!(panel.len(), 3);

        assert_eq!(panel.remove_selected(Confirmation::Confirmed), BulkOutcome::Applied(2));
        assert_eq!(panel.len(), 1);
        assert!(panel.selection().is_empty());
    }

    #[test]
    fn test_update_single_record() {
        let mut panel = panel();
        assert!(panel.update("C", |o| o.status = OrderStatus::Shipped));
        assert_eq!(panel.get("C").unwrap().status, OrderStatus::Shipped);
        assert!(!panel.update("Z", |o| o.status = OrderStatus::Shipped));
    }

    #[test]
    fn test_prepend_live_with_limit() {
        let mut panel = panel().with_max_len(3);
        panel.toggle_selection("C");

        panel.prepend_live(order("D", "New", 10.0, OrderStatus::Pending));
        assert_eq!(ids(&panel.records().iter().collect::<Vec<_>>()), vec!["D", "A", "B"]);
        // C fell off the end and left the selection
        assert!(!panel.selection().contains("C"));

        panel.prepend_live(order("B", "Amy", 55.0, OrderStatus::Delivered));
        assert_eq!(ids(&panel.records().iter().collect::<Vec<_>>()), vec!["B", "D", "A"]);
        assert_eq!(panel.get("B").unwrap().total, 55.0);
    }
}
