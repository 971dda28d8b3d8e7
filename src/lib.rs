//! # storedash
//!
//! Core of a business-admin dashboard: the in-memory query engine behind the
//! orders, transactions and revenue panels, and the live feed that pushes new
//! transactions into them.
//!
//! ## Features
//!
//! - **Filtering**: text search, status/priority, amount bounds and date ranges
//! - **Sorting**: stable, locale-aware for text, with header-click toggling
//! - **Stats**: per-status counts, revenue, averages and period comparisons
//! - **Bulk actions**: selections with explicit confirmation
//! - **Live feed**: reconnecting WebSocket subscriber with typed events
//!
//! ## Modules
//!
//! - [`records`]: Domain records and the `Record` trait
//! - [`query`]: Filter, sort, stats, selection and panel state
//! - [`feed`]: Live feed subscriber
//! - [`export`]: CSV / JSON export
//! - [`source`]: REST and file loading with fallback
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use storedash::query::{FilterSpec, Panel, SortSpec};
//! use storedash::records::Order;
//!
//! let mut panel: Panel<Order> = Panel::new(orders);
//! panel.set_filter(FilterSpec::new().search("ann").status("pending"));
//! panel.toggle_sort("total");
//!
//! for order in panel.view() {
//!     println!("{} {:.2}", order.id, order.total);
//! }
//! println!("{}", panel.stats());
//! ```

pub mod config;
pub mod export;
pub mod feed;
pub mod query;
pub mod records;
pub mod source;

// Re-export top-level types for convenience
pub use records::{ExportRow, FieldValue, Order, Record, RevenueSample, Transaction};

pub use query::{
    apply_filter, bulk_apply, compute_stats, sort, toggle_selection, Confirmation, FilterSpec,
    Panel, QueryError, Selection, SortDirection, SortSpec, StatsSummary,
};

pub use feed::{
    prepend_bounded, ConnectionState, FeedConfig, FeedError, FeedEvent, LiveFeedSubscriber,
    Subscription, WsConnector,
};

pub use export::{ExportError, ExportFormat, ExportScope};

pub use source::{HttpSource, SourceError};

pub use config::{Config, ConfigError, LoggingConfig};
