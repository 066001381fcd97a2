//! WordPress source adapter for the content migrator.
//!
//! This crate provides:
//! - [`SourceKind`] config enum for choosing between mock and live sources
//! - [`ContentSource`] trait abstracting raw access to the source system
//! - [`WpClient`] production client talking to the WordPress REST API
//! - [`MockSource`] in-memory source for tests
//! - [`SourceAdapter`] pagination, per content type record cache, field value
//!   resolution and taxonomy substitution on top of any [`ContentSource`]
//!
//! ## Usage
//!
//! ```ignore
//! use content_migrator_source::{SourceAdapter, SourceKind};
//!
//! let source = SourceKind::live("https://example.com/wp-json").into_source()?;
//! let adapter = SourceAdapter::new(source).with_page_size(50);
//!
//! let posts = adapter.fetch_all("posts").await;
//! let title = adapter.field_value(&posts[0], "title").await;
//! ```

mod adapter;
mod mock;

pub use adapter::{parse_page_count, SourceAdapter, DEFAULT_PAGE_SIZE};
pub use mock::MockSource;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use content_migrator_shared::SourceRecord;
use reqwest::Client as ReqwestClient;
use serde_json::Value;

/// Header carrying the number of result pages of a listing request.
pub const TOTAL_PAGES_HEADER: &str = "x-wp-totalpages";

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("reqwest error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SourceError>;

/// One page of a content listing.
#[derive(Debug, Clone, Default)]
pub struct SourcePage {
    pub records: Vec<SourceRecord>,
    /// Raw value of the total pages header, if the source sent one.
    pub total_pages: Option<String>,
}

/// Raw access to the source system.
///
/// This trait abstracts the HTTP client to enable dependency injection and
/// mocking for testing. Production code uses [`WpClient`], while tests use
/// [`MockSource`].
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch one page (1-based) of records of a content type.
    async fn fetch_page(&self, content_type: &str, page: u32, per_page: u32)
        -> Result<SourcePage>;

    /// Fetch a JSON document by absolute URL (deferred references).
    async fn fetch_json(&self, url: &str) -> Result<Value>;

    /// Fetch raw bytes by absolute URL (media files).
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// Production client for the WordPress REST API.
///
/// # Example
///
/// ```ignore
/// use content_migrator_source::WpClient;
///
/// let client = WpClient::new("https://example.com/wp-json")?;
/// let page = client.fetch_page("posts", 1, 50).await?;
/// ```
pub struct WpClient {
    endpoint: String,
    client: ReqwestClient,
}

impl WpClient {
    /// Create a client for a REST root such as `https://site/wp-json` or
    /// `https://site/?rest_route=`.
    pub fn new(endpoint: &str) -> Result<Self> {
        url::Url::parse(endpoint)
            .map_err(|e| SourceError::InvalidUrl(format!("{}: {}", endpoint, e)))?;
        Ok(WpClient {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client: ReqwestClient::new(),
        })
    }

    fn listing_url(&self, content_type: &str, page: u32, per_page: u32) -> String {
        let separator = if self.endpoint.contains('?') { '&' } else { '?' };
        format!(
            "{}/wp/v2/{}{}per_page={}&page={}",
            self.endpoint, content_type, separator, per_page, page
        )
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let res = self.client.get(url).send().await?;
        let status = res.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::not_found(url));
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(res)
    }
}

#[async_trait]
impl ContentSource for WpClient {
    async fn fetch_page(
        &self,
        content_type: &str,
        page: u32,
        per_page: u32,
    ) -> Result<SourcePage> {
        let url = self.listing_url(content_type, page, per_page);
        let res = self.get(&url).await?;

        // HeaderMap lookups are case-insensitive.
        let total_pages = res
            .headers()
            .get(TOTAL_PAGES_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body: Value = res.json().await?;
        let records = match body {
            Value::Array(records) => records,
            other => {
                return Err(SourceError::decode(format!(
                    "expected an array of records from {}, got {}",
                    url, other
                )))
            }
        };

        Ok(SourcePage {
            records,
            total_pages,
        })
    }

    async fn fetch_json(&self, url: &str) -> Result<Value> {
        let res = self.get(url).await?;
        Ok(res.json().await?)
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let res = self.get(url).await?;
        let bytes = res.bytes().await?;
        Ok(bytes.to_vec())
    }
}

/// Configuration for the source system.
///
/// # Example
///
/// ```ignore
/// use content_migrator_source::SourceKind;
/// use std::collections::HashMap;
///
/// // Testing: serve records from memory
/// let mut records = HashMap::new();
/// records.insert("posts".to_string(), vec![post1, post2]);
/// let source = SourceKind::mock(records).into_source()?;
///
/// // Production: talk to a live site
/// let source = SourceKind::live("https://example.com/wp-json").into_source()?;
/// ```
#[derive(Debug, Clone)]
pub enum SourceKind {
    /// In-memory records keyed by content type name.
    Mock(HashMap<String, Vec<SourceRecord>>),

    /// A live WordPress REST API.
    Live {
        /// REST root, e.g. `https://example.com/wp-json`
        endpoint: String,
    },
}

impl SourceKind {
    pub fn mock(records: HashMap<String, Vec<SourceRecord>>) -> Self {
        Self::Mock(records)
    }

    pub fn live(endpoint: impl Into<String>) -> Self {
        Self::Live {
            endpoint: endpoint.into(),
        }
    }

    /// Create the matching [`ContentSource`] implementation.
    pub fn into_source(self) -> Result<Arc<dyn ContentSource>> {
        match self {
            Self::Mock(records) => {
                let source = records
                    .into_iter()
                    .fold(MockSource::new(), |source, (content_type, records)| {
                        source.with_records(&content_type, records)
                    });
                Ok(Arc::new(source))
            }
            Self::Live { endpoint } => Ok(Arc::new(WpClient::new(&endpoint)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_url() {
        let client = WpClient::new("https://example.com/wp-json/").unwrap();
        assert_eq!(
            client.listing_url("posts", 2, 50),
            "https://example.com/wp-json/wp/v2/posts?per_page=50&page=2"
        );
    }

    #[test]
    fn test_listing_url_with_query_endpoint() {
        let client = WpClient::new("https://example.com/?rest_route=").unwrap();
        assert_eq!(
            client.listing_url("categories", 1, 10),
            "https://example.com/?rest_route=/wp/v2/categories&per_page=10&page=1"
        );
    }

    #[test]
    fn test_invalid_endpoint() {
        let result = WpClient::new("not a url");
        assert!(matches!(result, Err(SourceError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_mock_kind_serves_records() {
        let mut records = HashMap::new();
        records.insert(
            "posts".to_string(),
            vec![serde_json::json!({"id": 1, "slug": "hello"})],
        );
        let source = SourceKind::mock(records).into_source().unwrap();
        let page = source.fetch_page("posts", 1, 50).await.unwrap();
        assert_eq!(page.records.len(), 1);
    }
}
