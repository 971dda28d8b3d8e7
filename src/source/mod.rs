//! Data Source
//!
//! Loads a panel's canonical collection from the REST API or a local JSON
//! file. Both accept a bare array or a `{"data": [...]}` envelope.
//!
//! A failed fetch is never fatal: [`HttpSource::load_or_fallback`] hands back
//! fallback records together with the error so the panel can show a degraded
//! state.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use reqwest::Client;

/// Errors raised while loading a collection
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("API unavailable at {0}")]
    Unavailable(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Invalid collection payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for source operations
pub type SourceResult<T> = Result<T, SourceError>;

#[derive(Deserialize)]
#[serde(untagged)]
enum CollectionBody<T> {
    Array(Vec<T>),
    Envelope { data: Vec<T> },
}

impl<T> CollectionBody<T> {
    fn into_records(self) -> Vec<T> {
        match self {
            CollectionBody::Array(records) | CollectionBody::Envelope { data: records } => records,
        }
    }
}

/// Decode a collection from a JSON body
pub fn parse_collection<T: DeserializeOwned>(body: &str) -> SourceResult<Vec<T>> {
    let body: CollectionBody<T> = serde_json::from_str(body)?;
    Ok(body.into_records())
}

/// Read a collection from a JSON file
pub fn load_file<T: DeserializeOwned>(path: &Path) -> SourceResult<Vec<T>> {
    let content = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = parse_collection(&content)?;
    tracing::debug!(path = %path.display(), "Loaded collection from file");
    Ok(records)
}

/// Records plus the error that forced a fallback, if any
#[derive(Debug)]
pub struct Loaded<T> {
    pub records: Vec<T>,
    pub degraded: Option<SourceError>,
}

impl<T> Loaded<T> {
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

/// REST API collection source
pub struct HttpSource {
    client: Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> SourceResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET a collection (e.g. `orders`)
    pub async fn fetch<T: DeserializeOwned>(&self, path: &str) -> SourceResult<Vec<T>> {
        let url = self.url(path);

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout
            } else if e.is_connect() {
                SourceError::Unavailable(url.clone())
            } else {
                SourceError::Request(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        let records: Vec<T> = parse_collection(&body)?;
        tracing::info!(url = %url, count = records.len(), "Fetched collection");
        Ok(records)
    }

    /// Fetch, or fall back to `fallback` on any failure
    pub async fn load_or_fallback<T: DeserializeOwned>(
        &self,
        path: &str,
        fallback: Vec<T>,
    ) -> Loaded<T> {
        match self.fetch(path).await {
            Ok(records) => Loaded {
                records,
                degraded: None,
            },
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Fetch failed, using fallback data");
                Loaded {
                    records: fallback,
                    degraded: Some(e),
                }
            }
        }
    }
}
