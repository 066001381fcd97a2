//! Migration configuration file.
//!
//! The file describes which source content types are migrated, how their
//! fields and blocks map onto destination components and how assets are
//! handled. Callable rules (`FieldDeriver`, `BlockTransformer`, target
//! resolvers) cannot be expressed in JSON; they are attached to the loaded
//! configuration programmatically.

use std::path::Path;
use std::sync::Arc;

use content_migrator_shared::{ContentTypeConfig, FieldMapping, MappingRule, RelationshipKind};
use serde::Deserialize;

use crate::errors::MigrationError;
use crate::inputs::{AuthorDeriver, AuthorMap};
use crate::processor::{BlockMapping, BlockTransformer};

/// Extensions harvested when the configuration does not list any.
pub const DEFAULT_ASSET_TYPES: [&str; 6] = ["png", "jpg", "jpeg", "gif", "svg", "pdf"];

/// Asset phase settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetSettings {
    /// Skip the whole asset phase when `false`.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// File extensions, without the dot.
    #[serde(default = "default_asset_types")]
    pub types: Vec<String>,
    /// Only harvest URLs hosted on the site domain.
    #[serde(default)]
    pub restrict_domain: bool,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            types: default_asset_types(),
            restrict_domain: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_asset_types() -> Vec<String> {
    DEFAULT_ASSET_TYPES.iter().map(|t| t.to_string()).collect()
}

/// Declarative block mapping as written in the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockMappingConfig {
    /// Source block type (`core/image`).
    pub name: String,
    #[serde(default)]
    pub new_block_name: Option<String>,
    #[serde(default)]
    pub schema_mapping: FieldMapping,
    #[serde(default)]
    pub ignore: bool,
}

impl From<BlockMappingConfig> for BlockMapping {
    fn from(config: BlockMappingConfig) -> Self {
        BlockMapping {
            name: config.name,
            new_block_name: config.new_block_name,
            schema_mapping: config.schema_mapping,
            ignore: config.ignore,
            transformer: None,
        }
    }
}

/// Field of a content type rewritten through the author map.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorFieldConfig {
    /// Source content type (`posts`).
    pub content_type: String,
    /// Source path holding the old author URL.
    pub source: String,
    /// Destination field receiving the new author slug.
    pub target: String,
}

/// Complete migration configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MigrationConfig {
    #[serde(default)]
    pub content_types: Vec<ContentTypeConfig>,
    #[serde(default)]
    pub blocks_mapping: Vec<BlockMappingConfig>,
    #[serde(default)]
    pub import_assets: AssetSettings,
    /// Create every source tag as a destination tag.
    #[serde(default)]
    pub migrate_tags: bool,
    /// Content field receiving the migration plan title.
    #[serde(default)]
    pub plan_title_field: Option<String>,
    /// Content field receiving the migration plan description.
    #[serde(default)]
    pub plan_description_field: Option<String>,
    /// Fields mapped through the author map, when one is loaded.
    #[serde(default)]
    pub author_fields: Vec<AuthorFieldConfig>,
    /// Block mappings attached in code, with custom transformers.
    #[serde(skip)]
    pub custom_blocks: Vec<BlockMapping>,
}

impl MigrationConfig {
    /// Load a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, MigrationError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MigrationError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, MigrationError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Relationship taxonomies must name a configured content type, since
    /// their slugs resolve to stories of that type. Value taxonomies only need
    /// the source records and are not checked.
    fn validate(&self) -> Result<(), MigrationError> {
        for content_type in &self.content_types {
            if content_type.name.is_empty() {
                return Err(MigrationError::config("content type name is required"));
            }
            for taxonomy in &content_type.taxonomies {
                if taxonomy.kind == RelationshipKind::Relationship
                    && !self.content_types.iter().any(|ct| ct.name == taxonomy.name) {
                    return Err(MigrationError::config(format!(
                        "taxonomy {} of {} is not a configured content type",
                        taxonomy.name, content_type.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Attach a custom transformer for a block type, replacing any
    /// declarative mapping of the same type.
    pub fn with_block_transformer(
        mut self,
        name: &str,
        transformer: Arc<dyn BlockTransformer>,
    ) -> Self {
        self.blocks_mapping.retain(|b| b.name != name);
        self.custom_blocks.retain(|b| b.name != name);
        self.custom_blocks
            .push(BlockMapping::with_transformer(name, transformer));
        self
    }

    /// Append an author derivation to every content type listed in
    /// `author_fields`.
    pub fn with_author_map(mut self, map: Arc<AuthorMap>) -> Self {
        for author_field in &self.author_fields {
            let Some(content_type) = self
                .content_types
                .iter_mut()
                .find(|ct| ct.name == author_field.content_type)
            else {
                continue;
            };
            content_type.schema_mapping.push(
                MappingRule::Derived {
                    name: format!("author_map:{}", author_field.source),
                    deriver: Arc::new(AuthorDeriver::new(map.clone(), &author_field.source)),
                },
                author_field.target.as_str(),
            );
        }
        self
    }

    /// Component a block type is renamed to, if mapped.
    pub fn block_component(&self, name: &str) -> Option<&str> {
        self.blocks_mapping
            .iter()
            .find(|b| b.name == name)
            .and_then(|b| b.new_block_name.as_deref())
    }

    /// Every block mapping, declarative ones first.
    pub fn block_mappings(&self) -> Vec<BlockMapping> {
        self.blocks_mapping
            .iter()
            .cloned()
            .map(BlockMapping::from)
            .chain(self.custom_blocks.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use content_migrator_shared::FieldDeriver;

    const CONFIG: &str = r#"{
        "content_types": [
            {
                "name": "posts",
                "new_content_type": "post",
                "folder": "blog",
                "schema_mapping": {
                    "title": "name",
                    "content": "content.body",
                    "categories": "content.categories",
                    "_links.wp:featuredmedia.0": {
                        "field": "content.image",
                        "component": "image",
                        "component_field": "src"
                    }
                },
                "taxonomies": [{"name": "categories", "field": "categories"}]
            },
            {
                "name": "categories",
                "new_content_type": "category",
                "schema_mapping": [["name", "name"], ["slug", "slug"]]
            }
        ],
        "blocks_mapping": [
            {"name": "core/spacer", "ignore": true},
            {"name": "core/image", "new_block_name": "image", "schema_mapping": {"attrs.url": "src"}}
        ],
        "import_assets": {"types": ["png"]}
    }"#;

    #[test]
    fn test_parse_config() {
        let config = MigrationConfig::from_json(CONFIG).unwrap();

        assert_eq!(config.content_types.len(), 2);
        let posts = &config.content_types[0];
        assert_eq!(posts.component_name(), "post");
        assert_eq!(posts.schema_mapping.len(), 4);
        assert_eq!(posts.folder.as_deref(), Some("blog"));

        let mappings = config.block_mappings();
        assert!(mappings[0].ignore);
        assert_eq!(mappings[1].component_name(), "image");

        assert!(config.import_assets.enabled);
        assert_eq!(config.import_assets.types, vec!["png".to_string()]);
        assert!(!config.migrate_tags);
    }

    #[test]
    fn test_default_asset_settings() {
        let config = MigrationConfig::from_json(r#"{"content_types": []}"#).unwrap();
        assert!(config.import_assets.enabled);
        assert_eq!(config.import_assets.types.len(), DEFAULT_ASSET_TYPES.len());
    }

    #[tokio::test]
    async fn test_author_map_attached_to_listed_types() {
        let raw = r#"{
            "content_types": [
                {"name": "posts", "schema_mapping": {"title": "name"}},
                {"name": "pages", "schema_mapping": {}}
            ],
            "author_fields": [
                {"content_type": "posts", "source": "author_url", "target": "content.author"}
            ]
        }"#;
        let map = Arc::new(AuthorMap::parse("https://old.example/author/jane jane-doe").unwrap());
        let config = MigrationConfig::from_json(raw).unwrap().with_author_map(map);

        let posts = &config.content_types[0].schema_mapping;
        assert_eq!(posts.len(), 2);
        assert!(config.content_types[1].schema_mapping.is_empty());

        let Some((MappingRule::Derived { deriver, .. }, _)) = posts.iter().last() else {
            panic!("expected a derived rule");
        };
        let record = serde_json::json!({"author_url": "https://old.example/author/jane/"});
        assert_eq!(
            deriver.derive(&record).await,
            Some(serde_json::json!("jane-doe"))
        );
    }

    #[test]
    fn test_unknown_taxonomy_rejected() {
        let raw = r#"{"content_types": [{
            "name": "posts",
            "schema_mapping": {},
            "taxonomies": [{"name": "tags", "field": "tags"}]
        }]}"#;
        assert!(matches!(
            MigrationConfig::from_json(raw),
            Err(MigrationError::Config(_))
        ));
    }

    #[test]
    fn test_value_taxonomy_needs_no_content_type() {
        let raw = r#"{"content_types": [{
            "name": "posts",
            "schema_mapping": {"tags": "content.tags"},
            "taxonomies": [{"name": "tags", "field": "tags", "kind": "value"}]
        }]}"#;
        let config = MigrationConfig::from_json(raw).unwrap();
        assert_eq!(
            config.content_types[0].taxonomies[0].kind,
            RelationshipKind::Value
        );
    }
}
