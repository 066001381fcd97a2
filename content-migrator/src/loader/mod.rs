//! Loader module for the content migrator.
//!
//! Materializes the migration queue in the destination: folders first, then
//! stories with their relationship fields resolved at creation time.

mod folders;
mod relationships;

pub use folders::FolderPlanner;
pub use relationships::RelationshipResolver;

use std::sync::Arc;

use content_migrator_repository::DestinationService;
use content_migrator_shared::MigrationEntry;
use tracing::{debug, error, info, instrument};

/// Outcome of loading a batch of stories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub created: usize,
    pub failed: usize,
    /// Relationship slugs left unresolved.
    pub unresolved: usize,
}

/// Creates stories in queue order.
pub struct StoryLoader {
    destination: Arc<DestinationService>,
    relationships: RelationshipResolver,
}

impl StoryLoader {
    pub fn new(destination: Arc<DestinationService>, relationships: RelationshipResolver) -> Self {
        Self {
            destination,
            relationships,
        }
    }

    /// Create every entry. A failed entry is logged and the loop continues.
    #[instrument(skip_all, fields(entry_count = entries.len()))]
    pub async fn load(&self, entries: Vec<MigrationEntry>) -> LoadSummary {
        let mut summary = LoadSummary::default();

        for mut entry in entries {
            summary.unresolved += self.relationships.resolve_entry(&mut entry).await;

            match self.destination.create_story(&entry.to_payload()).await {
                Ok(story) => {
                    debug!(
                        id = story.id,
                        slug = %story.full_slug,
                        source_path = %entry.source_path,
                        "Story migrated"
                    );
                    summary.created += 1;
                }
                Err(e) => {
                    error!(
                        name = %entry.name,
                        source_path = %entry.source_path,
                        error = %e,
                        "Failed to create story"
                    );
                    summary.failed += 1;
                }
            }
        }

        info!(
            created = summary.created,
            failed = summary.failed,
            unresolved = summary.unresolved,
            "Stories loaded"
        );
        summary
    }
}
