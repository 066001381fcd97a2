//! Destination service implementation.
//!
//! This module provides the main service for interacting with the destination
//! space. It validates requests, delegates to a `DestinationProvider` and
//! owns the per-session caches: component schemas and the link index are
//! fetched once, stories created during the run are remembered so that later
//! relationship lookups can skip the network.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info};

use crate::errors::DestinationError;
use crate::interfaces::DestinationProvider;
use crate::types::{ComponentSchemas, CreatedStory, FolderRequest, LinkIndex, SignedUpload};

/// The main service for interacting with the destination.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use content_migrator_repository::{DestinationService, StoryblokConfig, StoryblokProvider};
///
/// let provider = StoryblokProvider::new(StoryblokConfig::new("token", "12345"))?;
/// let service = DestinationService::new(Arc::new(provider));
///
/// let schemas = service.schemas().await?;
/// let links = service.link_index().await?;
/// ```
pub struct DestinationService {
    provider: Arc<dyn DestinationProvider>,
    schemas: OnceCell<Arc<ComponentSchemas>>,
    links: OnceCell<Arc<LinkIndex>>,
    created: RwLock<Vec<CreatedStory>>,
}

impl DestinationService {
    pub fn new(provider: Arc<dyn DestinationProvider>) -> Self {
        Self {
            provider,
            schemas: OnceCell::new(),
            links: OnceCell::new(),
            created: RwLock::new(Vec::new()),
        }
    }

    fn validate_required(field_name: &str, value: Option<&str>) -> Result<(), DestinationError> {
        match value {
            Some(v) if !v.is_empty() => Ok(()),
            _ => Err(DestinationError::validation(format!(
                "{} is required",
                field_name
            ))),
        }
    }

    /// Component schemas of the space, fetched on first use.
    pub async fn schemas(&self) -> Result<Arc<ComponentSchemas>, DestinationError> {
        self.schemas
            .get_or_try_init(|| async {
                let components = self.provider.fetch_components().await?;
                info!(count = components.len(), "Loaded component schemas");
                Ok::<_, DestinationError>(Arc::new(ComponentSchemas::new(components)))
            })
            .await
            .cloned()
    }

    /// Link index of the space, fetched on first use and never refreshed.
    pub async fn link_index(&self) -> Result<Arc<LinkIndex>, DestinationError> {
        self.links
            .get_or_try_init(|| async {
                let links = self.provider.fetch_links().await?;
                let index = LinkIndex::from_links(links);
                info!(
                    folders = index.folders.len(),
                    stories = index.stories.len(),
                    "Loaded link index"
                );
                Ok::<_, DestinationError>(Arc::new(index))
            })
            .await
            .cloned()
    }

    pub async fn create_folder(
        &self,
        request: &FolderRequest,
    ) -> Result<CreatedStory, DestinationError> {
        Self::validate_required("folder name", Some(&request.name))?;
        Self::validate_required("folder slug", Some(&request.slug))?;
        self.provider.create_folder(request).await
    }

    /// Create a story and remember it for the rest of the session.
    pub async fn create_story(&self, payload: &Value) -> Result<CreatedStory, DestinationError> {
        Self::validate_required("story name", payload.get("name").and_then(Value::as_str))?;
        Self::validate_required("story slug", payload.get("slug").and_then(Value::as_str))?;

        let story = self.provider.create_story(payload).await?;
        debug!(id = story.id, slug = %story.full_slug, "Story created");
        self.created.write().await.push(story.clone());
        Ok(story)
    }

    /// Uuid of a story created earlier in this session.
    pub async fn created_uuid(&self, slug: &str, component: &str) -> Option<String> {
        self.created
            .read()
            .await
            .iter()
            .find(|s| s.slug == slug && s.component() == Some(component))
            .map(|s| s.uuid.clone())
    }

    /// Number of stories created in this session.
    pub async fn created_count(&self) -> usize {
        self.created.read().await.len()
    }

    /// Query the destination for a story by slug and component.
    pub async fn find_story_uuid(
        &self,
        slug: &str,
        component: &str,
    ) -> Result<Option<String>, DestinationError> {
        self.provider.find_story_uuid(slug, component).await
    }

    pub async fn request_upload_slot(
        &self,
        filename: &str,
    ) -> Result<SignedUpload, DestinationError> {
        Self::validate_required("filename", Some(filename))?;
        self.provider.request_upload_slot(filename).await
    }

    pub async fn submit_upload(
        &self,
        slot: &SignedUpload,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<(), DestinationError> {
        self.provider.submit_upload(slot, filename, bytes).await
    }

    pub async fn create_tag(&self, name: &str) -> Result<(), DestinationError> {
        Self::validate_required("tag name", Some(name))?;
        self.provider.create_tag(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDestination;
    use serde_json::json;

    #[tokio::test]
    async fn test_link_index_fetched_once() {
        let mock = Arc::new(MockDestination::new().with_folder(1, "blog"));
        let service = DestinationService::new(mock.clone());

        let first = service.link_index().await.unwrap();
        let second = service.link_index().await.unwrap();
        assert!(first.has_folder("/blog/"));
        assert_eq!(second.folders.len(), 1);
        assert_eq!(mock.link_fetches(), 1);
    }

    #[tokio::test]
    async fn test_create_story_validates_payload() {
        let service = DestinationService::new(Arc::new(MockDestination::new()));

        let result = service
            .create_story(&json!({"name": "", "slug": "x", "content": {}}))
            .await;
        assert!(matches!(result, Err(DestinationError::Validation(_))));
        assert_eq!(service.created_count().await, 0);
    }

    #[tokio::test]
    async fn test_created_uuid_is_session_local() {
        let service = DestinationService::new(Arc::new(MockDestination::new()));
        let story = service
            .create_story(&json!({
                "name": "Alice",
                "slug": "alice",
                "content": {"component": "author"}
            }))
            .await
            .unwrap();

        assert_eq!(service.created_uuid("alice", "author").await, Some(story.uuid));
        assert_eq!(service.created_uuid("alice", "category").await, None);
    }
}
