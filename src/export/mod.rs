//! Export
//!
//! Serializes a view of records as CSV or pretty JSON and writes it under a
//! dated filename such as `orders-export-2024-03-01.csv`.
//!
//! The exported rows are the panel's filtered view by default; pass
//! [`ExportScope::All`] to export the whole collection.

use crate::query::Panel;
use crate::records::{ExportRow, Record};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Which records to export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportScope {
    /// What the panel currently shows
    #[default]
    Filtered,
    /// The full canonical collection
    All,
}

/// Export errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Output is not valid UTF-8: {0}")]
    Encoding(String),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExportError>;

/// `<prefix>-export-YYYY-MM-DD.<ext>`
pub fn export_filename(prefix: &str, format: ExportFormat, date: NaiveDate) -> String {
    format!(
        "{}-export-{}.{}",
        prefix,
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// Records of a panel for the given scope, in display order
pub fn scoped_rows<R: Record>(panel: &Panel<R>, scope: ExportScope) -> Vec<&R> {
    match scope {
        ExportScope::Filtered => panel.view(),
        ExportScope::All => panel.records().iter().collect(),
    }
}

/// CSV with a header row
pub fn to_csv<R: ExportRow>(rows: &[&R]) -> ExportResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(R::headers())?;
    for row in rows {
        writer.write_record(row.row())?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Encoding(e.to_string()))
}

/// Pretty-printed JSON array
pub fn to_json<R: Serialize>(rows: &[&R]) -> ExportResult<String> {
    Ok(serde_json::to_string_pretty(rows)?)
}

pub fn render<R: ExportRow + Serialize>(rows: &[&R], format: ExportFormat) -> ExportResult<String> {
    match format {
        ExportFormat::Csv => to_csv(rows),
        ExportFormat::Json => to_json(rows),
    }
}

/// Write an export file into `dir` and return its path
pub fn write_export<R: ExportRow + Serialize>(
    dir: &Path,
    prefix: &str,
    rows: &[&R],
    format: ExportFormat,
    date: NaiveDate,
) -> ExportResult<PathBuf> {
    let body = render(rows, format)?;

    std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = dir.join(export_filename(prefix, format, date));
    std::fs::write(&path, body).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;

    tracing::info!(
        path = %path.display(),
        format = %format,
        rows = rows.len(),
        "Export written"
    );

    Ok(path)
}
