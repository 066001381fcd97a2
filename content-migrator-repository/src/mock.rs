//! Mock destination for testing and local development.
//!
//! `MockDestination` keeps the whole space in memory. Created folders and
//! stories are appended to its link index, so a second migration run against
//! the same mock sees them as pre-existing. Failures can be injected per asset
//! and per story, and every remote call is counted.
//!
//! # Example
//!
//! ```ignore
//! use content_migrator_repository::{ComponentSchema, MockDestination};
//! use content_migrator_shared::FieldType;
//!
//! let destination = MockDestination::new()
//!     .with_component(ComponentSchema::new("post", [("body", FieldType::RichText)]))
//!     .with_rate_limited_slot("photo.png", usize::MAX);
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::DestinationError;
use crate::interfaces::DestinationProvider;
use crate::types::{ComponentSchema, CreatedStory, FolderRequest, Link, SignedUpload};

/// Public asset host of uploaded mock files.
pub const MOCK_ASSET_HOST: &str = "https://a.storyblok.test";

/// In-memory [`DestinationProvider`].
pub struct MockDestination {
    components: Vec<ComponentSchema>,
    links: Mutex<Vec<Link>>,
    created: Mutex<Vec<CreatedStory>>,
    tags: Mutex<Vec<String>>,
    uploads: Mutex<Vec<(String, Vec<u8>)>>,
    next_id: AtomicU64,
    slot_delay: Duration,
    slots_in_flight: AtomicUsize,
    max_slots_in_flight: AtomicUsize,
    rate_limited_slots: Mutex<HashMap<String, usize>>,
    failing_transfers: HashSet<String>,
    failing_stories: HashSet<String>,
    slot_requests: Mutex<HashMap<String, usize>>,
    link_fetches: AtomicUsize,
    story_lookups: AtomicUsize,
}

impl Default for MockDestination {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDestination {
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
            links: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            tags: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1000),
            slot_delay: Duration::ZERO,
            slots_in_flight: AtomicUsize::new(0),
            max_slots_in_flight: AtomicUsize::new(0),
            rate_limited_slots: Mutex::new(HashMap::new()),
            failing_transfers: HashSet::new(),
            failing_stories: HashSet::new(),
            slot_requests: Mutex::new(HashMap::new()),
            link_fetches: AtomicUsize::new(0),
            story_lookups: AtomicUsize::new(0),
        }
    }

    pub fn with_component(mut self, component: ComponentSchema) -> Self {
        self.components.push(component);
        self
    }

    /// Pre-existing folder with a full slug such as `blog/news`.
    pub fn with_folder(self, id: u64, slug: &str) -> Self {
        self.push_link(id, slug, true, None);
        self
    }

    /// Pre-existing story with a full slug such as `blog/hello`.
    pub fn with_story(self, id: u64, slug: &str) -> Self {
        self.push_link(id, slug, false, None);
        self
    }

    /// Answer the next `times` slot requests for `filename` with a 429.
    pub fn with_rate_limited_slot(self, filename: &str, times: usize) -> Self {
        self.rate_limited_slots
            .lock()
            .expect("mock state poisoned")
            .insert(filename.to_string(), times);
        self
    }

    /// Hold every slot request for `delay` before answering.
    pub fn with_slot_delay(mut self, delay: Duration) -> Self {
        self.slot_delay = delay;
        self
    }

    /// Fail the byte transfer of `filename`.
    pub fn with_failing_transfer(mut self, filename: &str) -> Self {
        self.failing_transfers.insert(filename.to_string());
        self
    }

    /// Reject the creation of stories with `slug`.
    pub fn with_failing_story(mut self, slug: &str) -> Self {
        self.failing_stories.insert(slug.to_string());
        self
    }

    fn push_link(&self, id: u64, slug: &str, is_folder: bool, parent_id: Option<u64>) {
        self.links.lock().expect("mock state poisoned").push(Link {
            id,
            uuid: format!("uuid-{}", id),
            slug: slug.to_string(),
            is_folder,
            parent_id,
        });
    }

    fn full_slug(&self, slug: &str, parent_id: Option<u64>) -> String {
        let parent = parent_id.and_then(|id| {
            self.links
                .lock()
                .expect("mock state poisoned")
                .iter()
                .find(|l| l.id == id && l.is_folder)
                .map(|l| l.slug.clone())
        });
        match parent {
            Some(parent) => format!("{}/{}", parent, slug),
            None => slug.to_string(),
        }
    }

    fn record(
        &self,
        slug: &str,
        parent_id: Option<u64>,
        is_folder: bool,
        is_startpage: bool,
        content: Value,
    ) -> CreatedStory {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        // A start page answers at the folder path itself.
        let full_slug = if is_startpage {
            format!("{}/", self.full_slug("", parent_id).trim_end_matches('/'))
        } else {
            self.full_slug(slug, parent_id)
        };
        self.push_link(id, &full_slug, is_folder, parent_id);

        let story = CreatedStory {
            id,
            uuid: format!("uuid-{}", id),
            slug: slug.to_string(),
            full_slug,
            is_folder,
            content,
        };
        self.created.lock().expect("mock state poisoned").push(story.clone());
        story
    }

    /// Every folder and story created so far.
    pub fn created(&self) -> Vec<CreatedStory> {
        self.created.lock().expect("mock state poisoned").clone()
    }

    /// Stories (not folders) created so far.
    pub fn created_stories(&self) -> Vec<CreatedStory> {
        self.created().into_iter().filter(|s| !s.is_folder).collect()
    }

    /// Folders created so far.
    pub fn created_folders(&self) -> Vec<CreatedStory> {
        self.created().into_iter().filter(|s| s.is_folder).collect()
    }

    pub fn tags(&self) -> Vec<String> {
        self.tags.lock().expect("mock state poisoned").clone()
    }

    /// File names transferred so far.
    pub fn uploads(&self) -> Vec<String> {
        self.uploads
            .lock()
            .expect("mock state poisoned")
            .iter()
            .map(|(filename, _)| filename.clone())
            .collect()
    }

    /// Contents transferred under `filename`, in transfer order.
    pub fn uploaded_bytes(&self, filename: &str) -> Vec<Vec<u8>> {
        self.uploads
            .lock()
            .expect("mock state poisoned")
            .iter()
            .filter(|(name, _)| name == filename)
            .map(|(_, bytes)| bytes.clone())
            .collect()
    }

    /// Highest number of slot requests answered at the same time.
    pub fn max_concurrent_slots(&self) -> usize {
        self.max_slots_in_flight.load(Ordering::SeqCst)
    }

    /// Number of slot requests made for `filename`.
    pub fn slot_requests(&self, filename: &str) -> usize {
        self.slot_requests
            .lock()
            .expect("mock state poisoned")
            .get(filename)
            .copied()
            .unwrap_or(0)
    }

    fn allocate_slot(&self, filename: &str) -> Result<SignedUpload, DestinationError> {
        *self
            .slot_requests
            .lock()
            .expect("mock state poisoned")
            .entry(filename.to_string())
            .or_insert(0) += 1;

        let mut rate_limited = self.rate_limited_slots.lock().expect("mock state poisoned");
        if let Some(remaining) = rate_limited.get_mut(filename) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(DestinationError::rate_limited(format!(
                    "too many requests for {}",
                    filename
                )));
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(SignedUpload {
            id: Some(id),
            post_url: format!("{}/upload", MOCK_ASSET_HOST),
            pretty_url: format!("{}/f/{}/{}", MOCK_ASSET_HOST, id, filename),
            fields: serde_json::Map::new(),
        })
    }

    pub fn link_fetches(&self) -> usize {
        self.link_fetches.load(Ordering::SeqCst)
    }

    pub fn story_lookups(&self) -> usize {
        self.story_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DestinationProvider for MockDestination {
    async fn fetch_components(&self) -> Result<Vec<ComponentSchema>, DestinationError> {
        Ok(self.components.clone())
    }

    async fn fetch_links(&self) -> Result<Vec<Link>, DestinationError> {
        self.link_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.links.lock().expect("mock state poisoned").clone())
    }

    async fn create_folder(
        &self,
        request: &FolderRequest,
    ) -> Result<CreatedStory, DestinationError> {
        Ok(self.record(&request.slug, request.parent_id, true, false, Value::Null))
    }

    async fn create_story(&self, story: &Value) -> Result<CreatedStory, DestinationError> {
        let slug = story
            .get("slug")
            .and_then(Value::as_str)
            .ok_or_else(|| DestinationError::validation("story slug is required"))?;
        if self.failing_stories.contains(slug) {
            return Err(DestinationError::status(422, format!("slug {} rejected", slug)));
        }
        let parent_id = story.get("parent_id").and_then(Value::as_u64);
        let is_startpage = story
            .get("is_startpage")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let content = story.get("content").cloned().unwrap_or(Value::Null);
        Ok(self.record(slug, parent_id, false, is_startpage, content))
    }

    async fn find_story_uuid(
        &self,
        slug: &str,
        component: &str,
    ) -> Result<Option<String>, DestinationError> {
        self.story_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .created
            .lock()
            .expect("mock state poisoned")
            .iter()
            .find(|s| !s.is_folder && s.slug == slug && s.component() == Some(component))
            .map(|s| s.uuid.clone()))
    }

    async fn request_upload_slot(
        &self,
        filename: &str,
    ) -> Result<SignedUpload, DestinationError> {
        let in_flight = self.slots_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_slots_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        if !self.slot_delay.is_zero() {
            tokio::time::sleep(self.slot_delay).await;
        }
        let slot = self.allocate_slot(filename);
        self.slots_in_flight.fetch_sub(1, Ordering::SeqCst);
        slot
    }

    async fn submit_upload(
        &self,
        _slot: &SignedUpload,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<(), DestinationError> {
        if self.failing_transfers.contains(filename) {
            return Err(DestinationError::status(500, "transfer failed"));
        }
        self.uploads
            .lock()
            .expect("mock state poisoned")
            .push((filename.to_string(), bytes));
        Ok(())
    }

    async fn create_tag(&self, name: &str) -> Result<(), DestinationError> {
        self.tags.lock().expect("mock state poisoned").push(name.to_string());
        Ok(())
    }
}
