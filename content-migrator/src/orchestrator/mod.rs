//! Orchestrator module for the content migrator.
//!
//! Sequences one migration run: schema and link index fetch, per content type
//! record mapping, tags, asset harvest/upload/rewrite, folder materialization
//! and finally story creation with relationship resolution.

use std::collections::HashSet;
use std::sync::Arc;

use content_migrator_repository::{ComponentSchemas, DestinationService, LinkIndex};
use content_migrator_shared::utils::{folder_of, last_segment};
use content_migrator_shared::{ContentTypeConfig, MigrationEntry, SourceRecord};
use content_migrator_source::SourceAdapter;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::assets::{harvest, rewrite, AssetUploader, UploaderConfig};
use crate::config::MigrationConfig;
use crate::errors::MigrationError;
use crate::inputs::MigrationPlan;
use crate::loader::{FolderPlanner, RelationshipResolver, StoryLoader};
use crate::processor::markup::strip_tags;
use crate::processor::{BlockRegistry, FieldMapper};

/// Source content type holding the tags.
const TAGS_CONTENT_TYPE: &str = "tags";

/// Per-stage counters of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub records_fetched: usize,
    pub entries_queued: usize,
    /// Records whose destination path already exists.
    pub skipped_existing: usize,
    /// Records without a usable link.
    pub skipped_invalid: usize,
    pub tags_created: usize,
    pub assets_found: usize,
    pub assets_uploaded: usize,
    pub folders_created: usize,
    pub stories_created: usize,
    pub stories_failed: usize,
    pub unresolved_references: usize,
}

/// Content types ordered so that every taxonomy type comes before the types
/// referencing it. Declared order is kept otherwise. Self references are
/// ignored; on a cycle the remaining types keep their declared order.
pub fn sort_content_types(content_types: &[ContentTypeConfig]) -> Vec<ContentTypeConfig> {
    let mut remaining: Vec<&ContentTypeConfig> = content_types.iter().collect();
    let mut sorted = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let ready = remaining.iter().position(|candidate| {
            !remaining
                .iter()
                .any(|other| other.name != candidate.name && candidate.references(&other.name))
        });
        match ready {
            Some(index) => sorted.push(remaining.remove(index).clone()),
            None => {
                let names: Vec<&str> = remaining.iter().map(|ct| ct.name.as_str()).collect();
                warn!(content_types = ?names, "Taxonomy references form a cycle, keeping declared order");
                sorted.extend(remaining.drain(..).cloned());
            }
        }
    }
    sorted
}

/// Source path and folder of a record, from its `link`.
///
/// `folder` is inserted right after the origin. Returns `None` when the record
/// has no parseable link or the path has no folder.
fn record_location(record: &SourceRecord, folder: Option<&str>) -> Option<(String, String)> {
    let link = Url::parse(record.get("link")?.as_str()?).ok()?;
    let pathname = match folder.map(|f| f.trim_matches('/')).filter(|f| !f.is_empty()) {
        Some(folder) => format!("/{}{}", folder, link.path()),
        None => link.path().to_string(),
    };
    let folder = folder_of(&pathname, link.query().is_some())?;
    Some((pathname, folder))
}

/// Coordinates one migration run.
pub struct Orchestrator {
    source: Arc<SourceAdapter>,
    destination: Arc<DestinationService>,
    config: MigrationConfig,
    blocks: Arc<BlockRegistry>,
    uploader: UploaderConfig,
    site_domain: Option<String>,
    plan: Option<MigrationPlan>,
}

impl Orchestrator {
    pub fn new(
        source: Arc<SourceAdapter>,
        destination: Arc<DestinationService>,
        config: MigrationConfig,
    ) -> Self {
        let blocks = Arc::new(BlockRegistry::new(config.block_mappings()));
        Self {
            source,
            destination,
            config,
            blocks,
            uploader: UploaderConfig::default(),
            site_domain: None,
            plan: None,
        }
    }

    pub fn with_uploader_config(mut self, uploader: UploaderConfig) -> Self {
        self.uploader = uploader;
        self
    }

    /// Base of site-rooted asset URLs.
    pub fn with_site_domain(mut self, site_domain: impl Into<String>) -> Self {
        self.site_domain = Some(site_domain.into());
        self
    }

    pub fn with_plan(mut self, plan: MigrationPlan) -> Self {
        self.plan = Some(plan);
        self
    }

    /// Run the whole migration.
    ///
    /// Only failing to read the destination schemas or link index aborts the
    /// run. Every other failure is logged and counted.
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> Result<MigrationReport, MigrationError> {
        info!("Starting content migration");
        let mut report = MigrationReport::default();

        let schemas = self.destination.schemas().await?;
        let links = self.destination.link_index().await?;
        info!(
            components = schemas.len(),
            links = links.len(),
            "Destination state loaded"
        );

        let mut entries = self.map_records(schemas, &links, &mut report).await;

        if self.config.migrate_tags {
            report.tags_created = self.migrate_tags().await;
        }

        if self.config.import_assets.enabled {
            self.import_assets(&mut entries, &mut report).await?;
        } else {
            info!("Asset import disabled");
        }

        let planner = FolderPlanner::new(links);
        let mut folders = planner.plan_folders(&entries);
        planner.adopt_start_pages(&mut entries, &folders);
        report.folders_created = planner
            .create_folders(&mut folders, &self.destination)
            .await;
        planner.assign_parents(&mut entries, &folders);

        let bindings = ContentTypeConfig::taxonomy_bindings(&self.config.content_types);
        let loader = StoryLoader::new(
            self.destination.clone(),
            RelationshipResolver::new(self.destination.clone(), bindings),
        );
        let summary = loader.load(entries).await;
        report.stories_created = summary.created;
        report.stories_failed = summary.failed;
        report.unresolved_references = summary.unresolved;

        info!(report = ?report, "Migration complete");
        Ok(report)
    }

    /// Fetch and map every configured content type into the migration queue.
    #[instrument(skip_all)]
    async fn map_records(
        &self,
        schemas: Arc<ComponentSchemas>,
        links: &LinkIndex,
        report: &mut MigrationReport,
    ) -> Vec<MigrationEntry> {
        let mapper = FieldMapper::new(self.source.clone(), schemas, self.blocks.clone());
        let mut entries = Vec::new();

        for content_type in sort_content_types(&self.config.content_types) {
            self.source.import_taxonomies(&content_type.taxonomies).await;
            let records = self.source.fetch_all(&content_type.name).await;
            report.records_fetched += records.len();

            let before = entries.len();
            for record in records.iter() {
                match self.map_record(&mapper, &content_type, record, links).await {
                    Ok(entry) => entries.push(entry),
                    Err(Skip::Existing) => report.skipped_existing += 1,
                    Err(Skip::Invalid) => report.skipped_invalid += 1,
                }
            }

            info!(
                content_type = %content_type.name,
                fetched = records.len(),
                queued = entries.len() - before,
                "Content type mapped"
            );
        }

        report.entries_queued = entries.len();
        info!(
            queued = report.entries_queued,
            skipped_existing = report.skipped_existing,
            skipped_invalid = report.skipped_invalid,
            "Migration queue built"
        );
        entries
    }

    async fn map_record(
        &self,
        mapper: &FieldMapper,
        content_type: &ContentTypeConfig,
        record: &SourceRecord,
        links: &LinkIndex,
    ) -> Result<MigrationEntry, Skip> {
        let name = match self.source.field_value(record, "title").await {
            Some(Value::String(title)) => strip_tags(&title),
            _ => String::new(),
        };

        let Some((source_path, folder)) = record_location(record, content_type.folder.as_deref())
        else {
            warn!(
                name = %name,
                content_type = %content_type.name,
                "Record has no usable link, skipping"
            );
            return Err(Skip::Invalid);
        };

        let slug = record
            .get("slug")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| last_segment(&source_path))
            .unwrap_or_default()
            .to_string();

        let component = content_type.component_name();
        let mut entry = MigrationEntry::new(name, slug, component);
        entry.source_path = source_path;
        entry.source_folder_path = Some(folder);

        let mapped = mapper
            .populate_fields(
                record,
                component,
                &content_type.schema_mapping,
                &content_type.taxonomies,
            )
            .await;
        entry.merge_mapped(mapped);
        entry
            .content
            .insert("component".to_string(), Value::String(component.to_string()));

        if let Some(plan) = &self.plan {
            plan.apply(
                &mut entry,
                self.config.plan_title_field.as_deref(),
                self.config.plan_description_field.as_deref(),
            );
        }

        if links.has_story(&entry.source_path) {
            debug!(path = %entry.source_path, "Story already exists, skipping");
            return Err(Skip::Existing);
        }
        Ok(entry)
    }

    /// Create every source tag in the destination.
    #[instrument(skip_all)]
    async fn migrate_tags(&self) -> usize {
        let records = self.source.fetch_all(TAGS_CONTENT_TYPE).await;
        let mut seen = HashSet::new();
        let mut created = 0;

        for record in records.iter() {
            let Some(Value::String(name)) = self.source.field_value(record, "name").await else {
                continue;
            };
            let name = strip_tags(&name);
            if name.is_empty() || !seen.insert(name.clone()) {
                continue;
            }
            match self.destination.create_tag(&name).await {
                Ok(()) => created += 1,
                Err(e) => warn!(tag = %name, error = %e, "Failed to create tag"),
            }
        }

        info!(fetched = records.len(), created = created, "Tags migrated");
        created
    }

    /// Harvest, upload and rewrite every asset of the queue.
    #[instrument(skip_all)]
    async fn import_assets(
        &self,
        entries: &mut [MigrationEntry],
        report: &mut MigrationReport,
    ) -> Result<(), MigrationError> {
        let assets = harvest(
            entries,
            &self.config.import_assets,
            self.site_domain.as_deref(),
        )?;
        report.assets_found = assets.len();
        if assets.is_empty() {
            return Ok(());
        }

        let uploader = AssetUploader::new(
            self.source.clone(),
            self.destination.clone(),
            self.uploader.clone(),
        );
        let uploaded = uploader.upload_all(&assets).await;
        report.assets_uploaded = uploaded.len();

        let rewritten = rewrite(entries, &uploaded);
        debug!(rewritten = rewritten, "Asset references rewritten");
        uploader.cleanup().await;
        Ok(())
    }
}

/// Why a record did not enter the queue.
enum Skip {
    Existing,
    Invalid,
}
