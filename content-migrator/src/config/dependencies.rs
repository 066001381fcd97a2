//! Dependency initialization and wiring for the content migrator.

use std::sync::Arc;

use content_migrator_repository::{DestinationService, StoryblokProvider};
use content_migrator_source::{SourceAdapter, SourceKind};
use tracing::info;

use crate::assets::UploaderConfig;
use crate::config::{MigrationConfig, MigrationSettings};
use crate::errors::MigrationError;
use crate::inputs::{AuthorMap, MigrationPlan, TableBlockTransformer, TableLibrary, TABLEPRESS_BLOCK};
use crate::orchestrator::Orchestrator;

/// Component of table blocks when the configuration does not rename them.
const DEFAULT_TABLE_COMPONENT: &str = "table";

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// See [`MigrationSettings::from_env`] for the variables read. Fails when
    /// a required variable is missing or when the migration configuration or
    /// one of the configured input files cannot be loaded.
    pub fn new() -> Result<Self, MigrationError> {
        let settings = MigrationSettings::from_env()?;
        info!(
            wp_endpoint = %settings.wp_endpoint,
            space_id = %settings.storyblok.space_id,
            migration_config = %settings.migration_config.display(),
            asset_concurrency = settings.asset_concurrency,
            "Initializing dependencies"
        );

        let config = Self::load_config(&settings)?;

        let source = SourceKind::live(&settings.wp_endpoint).into_source()?;
        let source = Arc::new(SourceAdapter::new(source).with_page_size(settings.wp_page_size));

        let provider = StoryblokProvider::new(settings.storyblok.clone())?;
        let destination = Arc::new(DestinationService::new(Arc::new(provider)));

        let uploader = UploaderConfig {
            concurrency: settings.asset_concurrency,
            retry_limit: settings.asset_retry_limit,
            retry_base: settings.asset_retry_base,
            scratch_dir: settings.asset_scratch_dir.clone(),
        };

        let mut orchestrator =
            Orchestrator::new(source, destination, config).with_uploader_config(uploader);
        if let Some(domain) = &settings.site_domain {
            orchestrator = orchestrator.with_site_domain(domain);
        }
        if let Some(path) = &settings.migration_plan {
            let plan = MigrationPlan::from_file(path)?;
            info!(rows = plan.len(), "Migration plan loaded");
            orchestrator = orchestrator.with_plan(plan);
        }

        Ok(Self { orchestrator })
    }

    /// Load the migration configuration and attach the optional inputs.
    fn load_config(settings: &MigrationSettings) -> Result<MigrationConfig, MigrationError> {
        let mut config = MigrationConfig::from_file(&settings.migration_config)?;
        info!(
            content_types = config.content_types.len(),
            blocks = config.blocks_mapping.len(),
            "Migration configuration loaded"
        );

        if let Some(dir) = &settings.table_export_dir {
            let library = Arc::new(TableLibrary::load_dir(dir)?);
            let component = config
                .block_component(TABLEPRESS_BLOCK)
                .unwrap_or(DEFAULT_TABLE_COMPONENT)
                .to_string();
            config = config.with_block_transformer(
                TABLEPRESS_BLOCK,
                Arc::new(TableBlockTransformer::new(library, component)),
            );
        }

        if let Some(path) = &settings.author_map {
            config = config.with_author_map(Arc::new(AuthorMap::from_file(path)?));
        }

        Ok(config)
    }
}
