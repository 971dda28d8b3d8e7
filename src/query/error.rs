//! Query error types
//!
//! Filtering, sorting and aggregation cannot fail. The only fallible step is
//! turning a filter expression typed by a user into a `FilterSpec`.

use thiserror::Error;

/// Errors that can occur while parsing filter expressions
#[derive(Error, Debug, PartialEq)]
pub enum QueryError {
    /// Expression syntax error
    #[error("Parse error: {0}")]
    Parse(String),

    /// A `key:value` term whose value cannot be interpreted
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    /// Invalid date or date range
    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
