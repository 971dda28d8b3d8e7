//! Dashboard Records
//!
//! Domain entities held in panel collections and the trait the query engine
//! reads them through:
//!
//! - **record**: `Record`, `FieldValue` and the `ExportRow` trait
//! - **types**: `Order`, `Transaction`, `RevenueSample` and their enums

pub mod record;
pub mod types;

pub use record::{ExportRow, FieldValue, Record};
pub use types::{
    parse_flexible_date, Customer, LineItem, Order, OrderStatus, Priority, RevenueSample,
    Transaction, TransactionStatus,
};
