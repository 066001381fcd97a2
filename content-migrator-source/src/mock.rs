//! Mock content source for testing and local development.
//!
//! The `MockSource` serves pre-configured records, deferred-reference
//! documents and media files from memory, so tests run without network
//! access. Failures can be injected per page or per file and every request is
//! counted.
//!
//! # Example
//!
//! ```ignore
//! use content_migrator_source::{ContentSource, MockSource};
//! use serde_json::json;
//!
//! let source = MockSource::new()
//!     .with_records("posts", vec![json!({"id": 1, "slug": "hello"})])
//!     .with_document("https://site/wp-json/wp/v2/media/9", json!({"source_url": "https://site/a.png"}))
//!     .with_file("https://site/a.png", b"png".to_vec());
//!
//! let page = source.fetch_page("posts", 1, 50).await?;
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use content_migrator_shared::SourceRecord;
use serde_json::Value;

use crate::{ContentSource, Result, SourceError, SourcePage};

/// In-memory [`ContentSource`].
#[derive(Default)]
pub struct MockSource {
    records: HashMap<String, Vec<SourceRecord>>,
    documents: HashMap<String, Value>,
    files: HashMap<String, Vec<u8>>,
    failing_pages: HashSet<(String, u32)>,
    failing_files: HashSet<String>,
    page_header: HashMap<String, String>,
    page_requests: AtomicUsize,
    document_requests: AtomicUsize,
    file_requests: Mutex<HashMap<String, usize>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `records` for `content_type`, paginated by the requested page size.
    pub fn with_records(mut self, content_type: &str, records: Vec<SourceRecord>) -> Self {
        self.records.insert(content_type.to_string(), records);
        self
    }

    /// Serve a JSON document for a deferred reference URL.
    pub fn with_document(mut self, url: &str, document: Value) -> Self {
        self.documents.insert(url.to_string(), document);
        self
    }

    /// Serve raw bytes for a media URL.
    pub fn with_file(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(url.to_string(), bytes);
        self
    }

    /// Make one listing page fail with a server error.
    pub fn with_failing_page(mut self, content_type: &str, page: u32) -> Self {
        self.failing_pages.insert((content_type.to_string(), page));
        self
    }

    /// Make a media download fail.
    pub fn with_failing_file(mut self, url: &str) -> Self {
        self.failing_files.insert(url.to_string());
        self
    }

    /// Send a fixed total pages header for `content_type` instead of the
    /// computed one.
    pub fn with_page_header(mut self, content_type: &str, value: &str) -> Self {
        self.page_header
            .insert(content_type.to_string(), value.to_string());
        self
    }

    /// Number of listing pages requested so far.
    pub fn page_requests(&self) -> usize {
        self.page_requests.load(Ordering::SeqCst)
    }

    /// Number of deferred reference documents requested so far.
    pub fn document_requests(&self) -> usize {
        self.document_requests.load(Ordering::SeqCst)
    }

    /// Number of times `url` was downloaded.
    pub fn file_requests(&self, url: &str) -> usize {
        self.file_requests
            .lock()
            .expect("mock state poisoned")
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    /// Total number of downloads across every URL.
    pub fn total_file_requests(&self) -> usize {
        self.file_requests.lock().expect("mock state poisoned").values().sum()
    }
}

#[async_trait]
impl ContentSource for MockSource {
    async fn fetch_page(
        &self,
        content_type: &str,
        page: u32,
        per_page: u32,
    ) -> Result<SourcePage> {
        self.page_requests.fetch_add(1, Ordering::SeqCst);

        if self
            .failing_pages
            .contains(&(content_type.to_string(), page))
        {
            return Err(SourceError::Status {
                status: 500,
                url: format!("mock://{}?page={}", content_type, page),
            });
        }

        let records = self
            .records
            .get(content_type)
            .ok_or_else(|| SourceError::not_found(format!("content type {}", content_type)))?;

        let per_page = per_page.max(1) as usize;
        let computed_pages = records.len().div_ceil(per_page).max(1);
        let total_pages = self
            .page_header
            .get(content_type)
            .cloned()
            .unwrap_or_else(|| computed_pages.to_string());

        let start = (page.saturating_sub(1) as usize) * per_page;
        let records = records.iter().skip(start).take(per_page).cloned().collect();

        Ok(SourcePage {
            records,
            total_pages: Some(total_pages),
        })
    }

    async fn fetch_json(&self, url: &str) -> Result<Value> {
        self.document_requests.fetch_add(1, Ordering::SeqCst);
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| SourceError::not_found(format!("document not found in mock: {}", url)))
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        *self
            .file_requests
            .lock()
            .expect("mock state poisoned")
            .entry(url.to_string())
            .or_insert(0) += 1;

        if self.failing_files.contains(url) {
            return Err(SourceError::Status {
                status: 500,
                url: url.to_string(),
            });
        }
        self.files
            .get(url)
            .cloned()
            .ok_or_else(|| SourceError::not_found(format!("file not found in mock: {}", url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn posts(n: usize) -> Vec<SourceRecord> {
        (1..=n).map(|i| json!({"id": i, "slug": format!("post-{}", i)})).collect()
    }

    #[tokio::test]
    async fn test_mock_source_paginates() {
        let source = MockSource::new().with_records("posts", posts(5));

        let first = source.fetch_page("posts", 1, 2).await.unwrap();
        assert_eq!(first.records.len(), 2);
        assert_eq!(first.total_pages.as_deref(), Some("3"));

        let last = source.fetch_page("posts", 3, 2).await.unwrap();
        assert_eq!(last.records.len(), 1);
        assert_eq!(last.records[0]["slug"], "post-5");
        assert_eq!(source.page_requests(), 2);
    }

    #[tokio::test]
    async fn test_mock_source_failing_page() {
        let source = MockSource::new()
            .with_records("posts", posts(1))
            .with_failing_page("posts", 1);

        let result = source.fetch_page("posts", 1, 50).await;
        assert!(matches!(result, Err(SourceError::Status { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_mock_source_counts_downloads() {
        let source = MockSource::new().with_file("https://site/a.png", vec![1, 2, 3]);

        assert_eq!(source.fetch_bytes("https://site/a.png").await.unwrap(), vec![1, 2, 3]);
        assert!(source.fetch_bytes("https://site/b.png").await.is_err());
        assert_eq!(source.file_requests("https://site/a.png"), 1);
        assert_eq!(source.total_file_requests(), 2);
    }

    #[tokio::test]
    async fn test_mock_source_unknown_document() {
        let source = MockSource::new();

        let result = source.fetch_json("https://site/missing").await;
        if let Err(SourceError::NotFound(msg)) = result {
            assert!(msg.contains("missing"));
        } else {
            panic!("Expected NotFound error");
        }
    }
}
