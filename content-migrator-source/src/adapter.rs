//! Record retrieval and field resolution on top of a [`ContentSource`].

use std::collections::HashMap;
use std::sync::Arc;

use content_migrator_shared::utils::descendant;
use content_migrator_shared::{SourceRecord, TaxonomyRef};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::{ContentSource, Result};

pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Number of pages announced by the total pages header.
///
/// Anything but a positive integer means a single page.
pub fn parse_page_count(header: Option<&str>) -> u32 {
    header
        .and_then(|h| h.trim().parse::<u32>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(1)
}

/// Session view of the source system.
///
/// Records are fetched once per content type and kept for the whole run;
/// taxonomy substitution only ever looks at already-fetched records.
pub struct SourceAdapter {
    source: Arc<dyn ContentSource>,
    page_size: u32,
    records: RwLock<HashMap<String, Arc<Vec<SourceRecord>>>>,
}

impl SourceAdapter {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self {
            source,
            page_size: DEFAULT_PAGE_SIZE,
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Every record of `content_type`, in retrieval order.
    ///
    /// A failing page is logged and its records dropped; the call itself
    /// never fails. Results are cached for the session.
    #[instrument(skip(self))]
    pub async fn fetch_all(&self, content_type: &str) -> Arc<Vec<SourceRecord>> {
        if let Some(cached) = self.cached(content_type).await {
            return cached;
        }

        let mut records = Vec::new();
        let mut total_pages = 1;
        let mut page = 1;
        while page <= total_pages {
            match self
                .source
                .fetch_page(content_type, page, self.page_size)
                .await
            {
                Ok(result) => {
                    if page == 1 {
                        total_pages = parse_page_count(result.total_pages.as_deref());
                    }
                    records.extend(result.records);
                }
                Err(e) => {
                    warn!(
                        content_type = content_type,
                        page = page,
                        error = %e,
                        "Error while fetching entries from the source"
                    );
                }
            }
            page += 1;
        }

        info!(
            content_type = content_type,
            count = records.len(),
            pages = total_pages,
            "Fetched all the entries"
        );

        let records = Arc::new(records);
        self.records
            .write()
            .await
            .insert(content_type.to_string(), records.clone());
        records
    }

    /// Records of `content_type` if they were already fetched this session.
    pub async fn cached(&self, content_type: &str) -> Option<Arc<Vec<SourceRecord>>> {
        self.records.read().await.get(content_type).cloned()
    }

    /// Pre-load every taxonomy content type that is not cached yet.
    pub async fn import_taxonomies(&self, taxonomies: &[TaxonomyRef]) {
        for taxonomy in taxonomies {
            if self.cached(&taxonomy.name).await.is_none() {
                self.fetch_all(&taxonomy.name).await;
            }
        }
    }

    /// Value of a dotted field path.
    ///
    /// Rendered objects (`{rendered: ..}`) yield their rendered markup and
    /// deferred references (`{href: ..}`) are resolved with exactly one extra
    /// fetch, yielding the `source_url` of the linked document when it has
    /// one. Everything else is returned as is.
    pub async fn field_value(&self, record: &SourceRecord, path: &str) -> Option<Value> {
        let value = descendant(record, path)?;
        match value {
            Value::Object(map) if map.contains_key("rendered") => map.get("rendered").cloned(),
            Value::Object(map) => match map.get("href").and_then(Value::as_str) {
                Some(href) => self.resolve_reference(href).await,
                None => Some(value.clone()),
            },
            _ => Some(value.clone()),
        }
    }

    async fn resolve_reference(&self, href: &str) -> Option<Value> {
        match self.source.fetch_json(href).await {
            Ok(mut document) => match document.get_mut("source_url").map(Value::take) {
                Some(url) => Some(url),
                None => Some(document),
            },
            Err(e) => {
                warn!(href = href, error = %e, "Could not resolve linked resource");
                None
            }
        }
    }

    /// Replace taxonomy ids by slugs when `source_path` is a taxonomy field.
    ///
    /// Arrays map element-wise. Ids that cannot be resolved pass through.
    pub async fn resolve_taxonomy_value(
        &self,
        taxonomies: &[TaxonomyRef],
        value: Value,
        source_path: &str,
    ) -> Value {
        let Some(taxonomy) = taxonomies.iter().find(|t| t.field == source_path) else {
            return value;
        };
        let Some(records) = self.cached(&taxonomy.name).await else {
            debug!(
                taxonomy = %taxonomy.name,
                "Taxonomy was not imported, keeping raw ids"
            );
            return value;
        };

        let lookup = |id: Value| -> Value {
            records
                .iter()
                .find(|record| same_id(record.get("id"), &id))
                .and_then(|record| record.get("slug"))
                .cloned()
                .unwrap_or(id)
        };

        match value {
            Value::Array(ids) => Value::Array(ids.into_iter().map(lookup).collect()),
            id => lookup(id),
        }
    }

    /// Download a media file.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        self.source.fetch_bytes(url).await
    }
}

/// Loose id equality: `3` matches `"3"`.
fn same_id(record_id: Option<&Value>, id: &Value) -> bool {
    match (record_id.and_then(id_key), id_key(id)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn id_key(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockSource;
    use content_migrator_shared::RelationshipKind;
    use serde_json::json;

    fn adapter(source: MockSource) -> SourceAdapter {
        SourceAdapter::new(Arc::new(source))
    }

    fn categories() -> Vec<SourceRecord> {
        vec![
            json!({"id": 3, "slug": "news"}),
            json!({"id": 4, "slug": "events"}),
        ]
    }

    fn category_ref() -> TaxonomyRef {
        TaxonomyRef {
            name: "categories".to_string(),
            field: "categories".to_string(),
            kind: RelationshipKind::Relationship,
        }
    }

    #[test]
    fn test_parse_page_count() {
        assert_eq!(parse_page_count(Some("4")), 4);
        assert_eq!(parse_page_count(Some(" 2 ")), 2);
        assert_eq!(parse_page_count(Some("0")), 1);
        assert_eq!(parse_page_count(Some("-3")), 1);
        assert_eq!(parse_page_count(Some("many")), 1);
        assert_eq!(parse_page_count(None), 1);
    }

    #[tokio::test]
    async fn test_fetch_all_paginates_and_caches() {
        let posts: Vec<_> = (1..=5).map(|i| json!({"id": i})).collect();
        let source = Arc::new(MockSource::new().with_records("posts", posts));
        let adapter = SourceAdapter::new(source.clone()).with_page_size(2);

        let records = adapter.fetch_all("posts").await;
        assert_eq!(records.len(), 5);
        assert_eq!(records[4]["id"], 5);
        assert_eq!(source.page_requests(), 3);

        adapter.fetch_all("posts").await;
        assert_eq!(source.page_requests(), 3);
    }

    #[tokio::test]
    async fn test_fetch_all_drops_failing_page() {
        let posts: Vec<_> = (1..=4).map(|i| json!({"id": i})).collect();
        let source = MockSource::new()
            .with_records("posts", posts)
            .with_failing_page("posts", 2);
        let adapter = adapter(source).with_page_size(2);

        let records = adapter.fetch_all("posts").await;
        let ids: Vec<_> = records.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(2)]);
    }

    #[tokio::test]
    async fn test_fetch_all_malformed_header_is_one_page() {
        let posts: Vec<_> = (1..=4).map(|i| json!({"id": i})).collect();
        let source = Arc::new(
            MockSource::new()
                .with_records("posts", posts)
                .with_page_header("posts", "lots"),
        );
        let adapter = SourceAdapter::new(source.clone()).with_page_size(2);

        assert_eq!(adapter.fetch_all("posts").await.len(), 2);
        assert_eq!(source.page_requests(), 1);
    }

    #[tokio::test]
    async fn test_field_value_rendered() {
        let adapter = adapter(MockSource::new());
        let record = json!({"title": {"rendered": "Hello <b>World</b>"}, "slug": "hello"});

        assert_eq!(
            adapter.field_value(&record, "title").await,
            Some(json!("Hello <b>World</b>"))
        );
        assert_eq!(adapter.field_value(&record, "slug").await, Some(json!("hello")));
        assert_eq!(adapter.field_value(&record, "missing").await, None);
    }

    #[tokio::test]
    async fn test_field_value_resolves_reference_once() {
        let href = "https://site/wp-json/wp/v2/media/9";
        let source = Arc::new(
            MockSource::new()
                .with_document(href, json!({"id": 9, "source_url": "https://site/a.png"})),
        );
        let adapter = SourceAdapter::new(source.clone());
        let record = json!({"_links": {"wp:featuredmedia": [{"href": href}]}});

        let value = adapter
            .field_value(&record, "_links.wp:featuredmedia.0")
            .await;
        assert_eq!(value, Some(json!("https://site/a.png")));
        assert_eq!(source.document_requests(), 1);
    }

    #[tokio::test]
    async fn test_resolve_taxonomy_value() {
        let adapter = adapter(MockSource::new().with_records("categories", categories()));
        adapter.import_taxonomies(&[category_ref()]).await;

        let single = adapter
            .resolve_taxonomy_value(&[category_ref()], json!(3), "categories")
            .await;
        assert_eq!(single, json!("news"));

        let many = adapter
            .resolve_taxonomy_value(&[category_ref()], json!([4, "3", 99]), "categories")
            .await;
        assert_eq!(many, json!(["events", "news", 99]));
    }

    #[tokio::test]
    async fn test_resolve_taxonomy_value_ignores_unbound_path() {
        let adapter = adapter(MockSource::new().with_records("categories", categories()));
        adapter.import_taxonomies(&[category_ref()]).await;

        let value = adapter
            .resolve_taxonomy_value(&[category_ref()], json!(3), "author")
            .await;
        assert_eq!(value, json!(3));
    }
}
