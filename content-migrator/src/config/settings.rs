//! Environment settings.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use content_migrator_repository::config::{DEFAULT_CDN_URL, DEFAULT_MANAGEMENT_URL};
use content_migrator_repository::StoryblokConfig;
use content_migrator_source::DEFAULT_PAGE_SIZE;

use crate::errors::MigrationError;

/// Default path of the migration configuration file.
const DEFAULT_MIGRATION_CONFIG: &str = "migration.json";

/// Default number of concurrent asset uploads.
pub const DEFAULT_ASSET_CONCURRENCY: usize = 5;

/// Default number of attempts of an asset upload.
pub const DEFAULT_ASSET_RETRY_LIMIT: usize = 4;

/// Default base delay between asset upload attempts, in milliseconds.
const DEFAULT_ASSET_RETRY_BASE_MS: u64 = 500;

/// Default scratch directory of downloaded assets.
const DEFAULT_ASSET_SCRATCH_DIR: &str = "./temp";

/// Every environment-driven setting of a run.
#[derive(Debug, Clone)]
pub struct MigrationSettings {
    pub wp_endpoint: String,
    pub wp_page_size: u32,
    pub storyblok: StoryblokConfig,
    /// Base of site-rooted asset URLs (`https://example.com`).
    pub site_domain: Option<String>,
    pub migration_config: PathBuf,
    pub asset_concurrency: usize,
    pub asset_retry_limit: usize,
    pub asset_retry_base: Duration,
    pub asset_scratch_dir: PathBuf,
    pub table_export_dir: Option<PathBuf>,
    pub author_map: Option<PathBuf>,
    pub migration_plan: Option<PathBuf>,
}

fn required(name: &str) -> Result<String, MigrationError> {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| MigrationError::config(format!("{} is required", name)))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl MigrationSettings {
    /// Read the settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `WP_ENDPOINT`: WordPress REST root (required)
    /// - `STORYBLOK_OAUTH_TOKEN`: management API token (required)
    /// - `STORYBLOK_SPACE_ID`: destination space (required)
    /// - `STORYBLOK_MANAGEMENT_URL`, `STORYBLOK_CDN_URL`: API bases
    /// - `SITE_DOMAIN`: base of site-rooted asset URLs
    /// - `MIGRATION_CONFIG`: configuration file (default: migration.json)
    /// - `ASSET_CONCURRENCY` (default: 5), `ASSET_RETRY_LIMIT` (default: 4),
    ///   `ASSET_RETRY_BASE_MS` (default: 500), `ASSET_SCRATCH_DIR` (default: ./temp)
    /// - `WP_PAGE_SIZE` (default: 50)
    /// - `TABLE_EXPORT_DIR`, `AUTHOR_MAP`, `MIGRATION_PLAN`: optional inputs
    pub fn from_env() -> Result<Self, MigrationError> {
        let wp_endpoint = required("WP_ENDPOINT")?;
        let oauth_token = required("STORYBLOK_OAUTH_TOKEN")?;
        let space_id = required("STORYBLOK_SPACE_ID")?;

        let storyblok = StoryblokConfig::new(oauth_token, space_id)
            .with_management_url(
                optional("STORYBLOK_MANAGEMENT_URL")
                    .unwrap_or_else(|| DEFAULT_MANAGEMENT_URL.to_string()),
            )
            .with_cdn_url(
                optional("STORYBLOK_CDN_URL").unwrap_or_else(|| DEFAULT_CDN_URL.to_string()),
            );

        Ok(Self {
            wp_endpoint,
            wp_page_size: parsed("WP_PAGE_SIZE", DEFAULT_PAGE_SIZE),
            storyblok,
            site_domain: optional("SITE_DOMAIN").map(|d| d.trim_end_matches('/').to_string()),
            migration_config: optional("MIGRATION_CONFIG")
                .unwrap_or_else(|| DEFAULT_MIGRATION_CONFIG.to_string())
                .into(),
            asset_concurrency: parsed("ASSET_CONCURRENCY", DEFAULT_ASSET_CONCURRENCY).max(1),
            asset_retry_limit: parsed("ASSET_RETRY_LIMIT", DEFAULT_ASSET_RETRY_LIMIT).max(1),
            asset_retry_base: Duration::from_millis(parsed(
                "ASSET_RETRY_BASE_MS",
                DEFAULT_ASSET_RETRY_BASE_MS,
            )),
            asset_scratch_dir: optional("ASSET_SCRATCH_DIR")
                .unwrap_or_else(|| DEFAULT_ASSET_SCRATCH_DIR.to_string())
                .into(),
            table_export_dir: optional("TABLE_EXPORT_DIR").map(PathBuf::from),
            author_map: optional("AUTHOR_MAP").map(PathBuf::from),
            migration_plan: optional("MIGRATION_PLAN").map(PathBuf::from),
        })
    }
}
