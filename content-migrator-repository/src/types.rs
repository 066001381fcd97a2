//! Request and response types for destination operations.

use std::collections::HashMap;

use content_migrator_shared::types::mapping::CONTENT_PREFIX;
use content_migrator_shared::utils::compare_slugs;
use content_migrator_shared::FieldType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One declared field of a component schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SchemaField {
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
}

/// A destination component and its field schema.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ComponentSchema {
    pub name: String,
    #[serde(default)]
    pub schema: HashMap<String, SchemaField>,
}

impl ComponentSchema {
    /// Build a schema from `(field, type)` pairs.
    pub fn new<'a>(name: &str, fields: impl IntoIterator<Item = (&'a str, FieldType)>) -> Self {
        Self {
            name: name.to_string(),
            schema: fields
                .into_iter()
                .map(|(field, field_type)| (field.to_string(), SchemaField { field_type }))
                .collect(),
        }
    }
}

/// Outcome of a field type lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaLookup {
    Found(FieldType),
    /// The component exists but does not declare the field.
    MissingField,
    /// The component is not defined in the destination.
    MissingComponent,
}

impl SchemaLookup {
    /// Declared type, plain text when the lookup missed.
    pub fn field_type(self) -> FieldType {
        match self {
            Self::Found(field_type) => field_type,
            Self::MissingField | Self::MissingComponent => FieldType::Text,
        }
    }
}

/// Typed view of every component schema of the destination space.
#[derive(Debug, Clone, Default)]
pub struct ComponentSchemas {
    components: HashMap<String, ComponentSchema>,
}

impl ComponentSchemas {
    pub fn new(components: Vec<ComponentSchema>) -> Self {
        Self {
            components: components
                .into_iter()
                .map(|c| (c.name.clone(), c))
                .collect(),
        }
    }

    pub fn component(&self, name: &str) -> Option<&ComponentSchema> {
        self.components.get(name)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Declared type of `field` on `component`. A `content.` prefix is ignored.
    pub fn lookup(&self, component: &str, field: &str) -> SchemaLookup {
        let Some(schema) = self.components.get(component) else {
            return SchemaLookup::MissingComponent;
        };
        let field = field.strip_prefix(CONTENT_PREFIX).unwrap_or(field);
        match schema.schema.get(field) {
            Some(declared) => SchemaLookup::Found(declared.field_type.clone()),
            None => SchemaLookup::MissingField,
        }
    }
}

/// One entry of the destination link index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: u64,
    #[serde(default)]
    pub uuid: String,
    pub slug: String,
    #[serde(default)]
    pub is_folder: bool,
    #[serde(default)]
    pub parent_id: Option<u64>,
}

/// Already existing folders and stories of the destination space.
#[derive(Debug, Clone, Default)]
pub struct LinkIndex {
    pub folders: Vec<Link>,
    pub stories: Vec<Link>,
}

impl LinkIndex {
    pub fn from_links(links: impl IntoIterator<Item = Link>) -> Self {
        let (folders, stories) = links.into_iter().partition(|link| link.is_folder);
        Self { folders, stories }
    }

    /// Existing folder at `path`, slashes normalized.
    pub fn folder(&self, path: &str) -> Option<&Link> {
        self.folders.iter().find(|f| compare_slugs(&f.slug, path))
    }

    /// Existing story at `path`, slashes normalized.
    pub fn story(&self, path: &str) -> Option<&Link> {
        self.stories.iter().find(|s| compare_slugs(&s.slug, path))
    }

    pub fn has_folder(&self, path: &str) -> bool {
        self.folder(path).is_some()
    }

    pub fn has_story(&self, path: &str) -> bool {
        self.story(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.folders.len() + self.stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.stories.is_empty()
    }
}

/// A story or folder as returned after creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreatedStory {
    pub id: u64,
    #[serde(default)]
    pub uuid: String,
    pub slug: String,
    #[serde(default)]
    pub full_slug: String,
    #[serde(default)]
    pub is_folder: bool,
    #[serde(default)]
    pub content: Value,
}

impl CreatedStory {
    /// Component of the created story.
    pub fn component(&self) -> Option<&str> {
        self.content.get("component").and_then(Value::as_str)
    }
}

/// Request to create a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderRequest {
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u64>,
}

/// Signed upload target returned when requesting an asset slot.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SignedUpload {
    #[serde(default)]
    pub id: Option<u64>,
    pub post_url: String,
    /// Final public URL of the asset.
    pub pretty_url: String,
    /// Form fields to submit ahead of the file.
    #[serde(default)]
    pub fields: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_lookup() {
        let schemas = ComponentSchemas::new(vec![ComponentSchema::new(
            "post",
            [("body", FieldType::RichText), ("title", FieldType::Text)],
        )]);

        assert_eq!(
            schemas.lookup("post", "content.body"),
            SchemaLookup::Found(FieldType::RichText)
        );
        assert_eq!(schemas.lookup("post", "teaser"), SchemaLookup::MissingField);
        assert_eq!(schemas.lookup("page", "body"), SchemaLookup::MissingComponent);
        assert_eq!(schemas.lookup("page", "body").field_type(), FieldType::Text);
    }

    #[test]
    fn test_components_response_decodes() {
        let response = json!({
            "components": [
                {"name": "post", "schema": {"body": {"type": "bloks", "pos": 0}}},
                {"name": "category"}
            ]
        });
        let components: Vec<ComponentSchema> =
            serde_json::from_value(response["components"].clone()).unwrap();
        let schemas = ComponentSchemas::new(components);
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas.lookup("post", "body"), SchemaLookup::Found(FieldType::Bloks));
    }

    #[test]
    fn test_link_index_partitions_and_compares() {
        let index = LinkIndex::from_links(vec![
            Link {
                id: 1,
                uuid: "u1".to_string(),
                slug: "blog".to_string(),
                is_folder: true,
                parent_id: None,
            },
            Link {
                id: 2,
                uuid: "u2".to_string(),
                slug: "blog/hello".to_string(),
                is_folder: false,
                parent_id: Some(1),
            },
        ]);

        assert_eq!(index.folders.len(), 1);
        assert!(index.has_folder("/blog/"));
        assert!(index.has_story("/blog/hello/"));
        assert!(!index.has_story("/blog/"));
    }
}
