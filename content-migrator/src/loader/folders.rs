//! Destination folder planning and materialization.
//!
//! Folders are derived from the distinct folder paths of the queued entries,
//! closed upward so that every ancestor exists, then created shallowest
//! first so a parent always exists before its children.

use std::sync::Arc;

use content_migrator_repository::{DestinationService, FolderRequest, LinkIndex};
use content_migrator_shared::utils::{
    compare_slugs, humanize_slug, last_segment, normalize_path, parent_path, path_depth,
};
use content_migrator_shared::{FolderDescriptor, MigrationEntry};
use tracing::{debug, error, info, instrument, warn};

/// Canonical `/a/b/` form of a folder path.
fn canonical(path: &str) -> String {
    format!("/{}/", normalize_path(path))
}

fn descriptor(path: &str) -> Option<FolderDescriptor> {
    let path = canonical(path);
    let slug = last_segment(&path)?.to_string();
    Some(FolderDescriptor {
        name: humanize_slug(&slug),
        slug,
        parent: parent_path(&path),
        path,
        id: None,
    })
}

/// Plans and creates the folders of one migration run.
pub struct FolderPlanner {
    links: Arc<LinkIndex>,
}

impl FolderPlanner {
    pub fn new(links: Arc<LinkIndex>) -> Self {
        Self { links }
    }

    fn is_covered(&self, planned: &[FolderDescriptor], path: &str) -> bool {
        planned.iter().any(|f| compare_slugs(&f.path, path)) || self.links.has_folder(path)
    }

    /// Folder descriptors needed by `entries`, shallowest first.
    ///
    /// Folders that already exist in the destination are not planned. The
    /// root is implicit and never planned.
    pub fn plan_folders(&self, entries: &[MigrationEntry]) -> Vec<FolderDescriptor> {
        let mut planned: Vec<FolderDescriptor> = Vec::new();

        for folder in entries.iter().filter_map(|e| e.source_folder_path.as_deref()) {
            if self.is_covered(&planned, folder) {
                continue;
            }
            if let Some(descriptor) = descriptor(folder) {
                planned.push(descriptor);
            }
        }

        // Upward closure: planned grows while it is walked.
        let mut i = 0;
        while i < planned.len() {
            if let Some(parent) = planned[i].parent.clone() {
                if !self.is_covered(&planned, &parent) {
                    if let Some(descriptor) = descriptor(&parent) {
                        planned.push(descriptor);
                    }
                }
            }
            i += 1;
        }

        planned.sort_by_key(|f| path_depth(&f.path));
        info!(count = planned.len(), "Planned folders");
        planned
    }

    /// Entries living at a folder path become the start page of that folder.
    ///
    /// An entry whose own path is a planned or existing folder adopts it as
    /// its folder; afterwards every entry whose folder equals its own path is
    /// marked as start page and no other entry is.
    pub fn adopt_start_pages(&self, entries: &mut [MigrationEntry], folders: &[FolderDescriptor]) {
        for entry in entries.iter_mut() {
            if self.is_covered(folders, &entry.source_path) {
                entry.source_folder_path = Some(entry.source_path.clone());
            }
            entry.is_startpage = entry
                .source_folder_path
                .as_deref()
                .is_some_and(|folder| compare_slugs(folder, &entry.source_path));
        }
    }

    /// Destination id of the folder at `path`, created this run or existing.
    fn folder_id(&self, folders: &[FolderDescriptor], path: &str) -> Option<u64> {
        folders
            .iter()
            .find(|f| compare_slugs(&f.path, path))
            .and_then(|f| f.id)
            .or_else(|| self.links.folder(path).map(|link| link.id))
    }

    /// Create every planned folder, in order, recording the created ids.
    ///
    /// A failed folder is logged and skipped; its descendants are skipped too
    /// since they have no parent to attach to.
    #[instrument(skip_all, fields(folder_count = folders.len()))]
    pub async fn create_folders(
        &self,
        folders: &mut [FolderDescriptor],
        destination: &DestinationService,
    ) -> usize {
        let mut created = 0;

        for i in 0..folders.len() {
            let parent_id = match folders[i].parent.clone() {
                Some(parent) => match self.folder_id(folders, &parent) {
                    Some(id) => Some(id),
                    None => {
                        warn!(
                            path = %folders[i].path,
                            parent = %parent,
                            "Parent folder is missing, skipping folder"
                        );
                        continue;
                    }
                },
                None => None,
            };

            let request = FolderRequest {
                name: folders[i].name.clone(),
                slug: folders[i].slug.clone(),
                parent_id,
            };
            match destination.create_folder(&request).await {
                Ok(folder) => {
                    debug!(path = %folders[i].path, id = folder.id, "Folder created");
                    folders[i].id = Some(folder.id);
                    created += 1;
                }
                Err(e) => {
                    error!(path = %folders[i].path, error = %e, "Failed to create folder");
                }
            }
        }

        info!(created = created, "Folders created");
        created
    }

    /// Attach every entry to its folder. Entries whose folder could not be
    /// resolved stay at the root.
    pub fn assign_parents(&self, entries: &mut [MigrationEntry], folders: &[FolderDescriptor]) {
        for entry in entries.iter_mut() {
            entry.parent_id = entry
                .source_folder_path
                .as_deref()
                .and_then(|folder| self.folder_id(folders, folder));
        }
    }
}
