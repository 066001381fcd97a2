//! Destination provider trait definition.
//!
//! This module defines the abstract interface for the destination content
//! system, allowing the Storyblok implementation to be swapped for an
//! in-memory one in tests.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::DestinationError;
use crate::types::{ComponentSchema, CreatedStory, FolderRequest, Link, SignedUpload};

/// Abstracts the destination headless CMS.
///
/// Implementations are injected into `DestinationService`, which adds the
/// session caches (schemas, link index, stories created this run) on top.
/// Every method maps one remote call, except [`fetch_links`] which also
/// resolves the read token it needs.
///
/// [`fetch_links`]: DestinationProvider::fetch_links
#[async_trait]
pub trait DestinationProvider: Send + Sync {
    /// Fetch every component schema of the space.
    async fn fetch_components(&self) -> Result<Vec<ComponentSchema>, DestinationError>;

    /// Fetch the full folder and story link index of the space.
    async fn fetch_links(&self) -> Result<Vec<Link>, DestinationError>;

    /// Create a folder.
    async fn create_folder(&self, request: &FolderRequest)
        -> Result<CreatedStory, DestinationError>;

    /// Create a story from a complete payload (`name`, `slug`, `content`, ...).
    async fn create_story(&self, story: &Value) -> Result<CreatedStory, DestinationError>;

    /// Uuid of the first story whose slug ends with `slug` and whose content
    /// type is `component`.
    async fn find_story_uuid(
        &self,
        slug: &str,
        component: &str,
    ) -> Result<Option<String>, DestinationError>;

    /// Request an upload slot for a file name.
    async fn request_upload_slot(&self, filename: &str)
        -> Result<SignedUpload, DestinationError>;

    /// Transfer file bytes to a signed upload target.
    async fn submit_upload(
        &self,
        slot: &SignedUpload,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<(), DestinationError>;

    /// Create a tag.
    async fn create_tag(&self, name: &str) -> Result<(), DestinationError>;
}
