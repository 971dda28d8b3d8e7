//! Collection Query Engine
//!
//! In-memory querying of a panel's canonical collection:
//!
//! - **filter**: `FilterSpec` and `apply_filter` (AND of all active dimensions)
//! - **sort**: `SortSpec` and a stable `sort`
//! - **stats**: `compute_stats`, period comparison and revenue buckets
//! - **selection**: `Selection`, `toggle_selection`, confirmed bulk operations
//! - **panel**: `Panel`, the per-panel state tying the above together
//! - **parser**: filter expressions (`status:pending amount:100..500 sort:-total`)
//!
//! # Example
//!
//! ```rust,ignore
//! use storedash::query::{apply_filter, compute_stats, sort, FilterSpec, SortSpec};
//!
//! let view = apply_filter(&orders, &FilterSpec::new().status("delivered").min_amount(100.0));
//! let view = sort(view, &SortSpec::desc("total"));
//!
//! // Dashboard totals come from the unfiltered collection
//! let stats = compute_stats(&orders);
//! ```

mod error;
mod filter;
mod panel;
mod parser;
mod selection;
mod sort;
mod stats;

pub use error::{QueryError, QueryResult};
pub use filter::{apply_filter, apply_filter_with, DateRange, FilterFields, FilterSpec, ALL};
pub use panel::Panel;
pub use parser::{parse_filter_expression, parse_filter_expression_at, FilterQuery};
pub use selection::{
    bulk_apply, remove_records, toggle_selection, BulkOutcome, Confirmation, Selection,
};
pub use sort::{compare_values, locale_cmp, sort, SortDirection, SortSpec};
pub use stats::{
    compare_periods, compute_stats, compute_stats_with, percentage_change, revenue_by_period,
    Interval, PeriodComparison, RevenueBucket, StatsConfig, StatsSummary,
};
