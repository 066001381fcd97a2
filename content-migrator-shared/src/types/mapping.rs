//! Declarative mapping tables.
//!
//! A [`FieldMapping`] is an ordered list of `(source, target)` pairs. Sources
//! are dotted descendant paths or derivation functions receiving the whole
//! record; targets are flat field names, `content.<field>` names, structured
//! component targets, or functions choosing one of those per record.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::types::record::SourceRecord;

/// Prefix marking a target nested under the `content` key.
pub const CONTENT_PREFIX: &str = "content.";

/// Capability computing a field value from a whole source record.
///
/// Implementations are supplied by the caller at configuration time; the
/// mapper never inspects them. Returning `None` means "absent".
#[async_trait]
pub trait FieldDeriver: Send + Sync {
    async fn derive(&self, record: &SourceRecord) -> Option<Value>;
}

/// Capability choosing the destination target for a given record.
///
/// The returned target must be a static one; a nested [`Target::Derived`] is
/// treated as unresolvable and the entry is skipped.
#[async_trait]
pub trait TargetResolver: Send + Sync {
    async fn resolve(&self, record: &SourceRecord) -> Target;
}

/// Where a mapped value comes from.
#[derive(Clone)]
pub enum MappingRule {
    /// Dotted descendant path (`_links.wp:featuredmedia.0`).
    Static(String),
    /// Value computed from the whole record. `name` is used in logs.
    Derived {
        name: String,
        deriver: Arc<dyn FieldDeriver>,
    },
}

impl MappingRule {
    /// Path or name identifying the rule.
    pub fn name(&self) -> &str {
        match self {
            Self::Static(path) => path,
            Self::Derived { name, .. } => name,
        }
    }
}

impl fmt::Debug for MappingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(path) => f.debug_tuple("Static").field(path).finish(),
            Self::Derived { name, .. } => f.debug_struct("Derived").field("name", name).finish(),
        }
    }
}

impl From<&str> for MappingRule {
    fn from(path: &str) -> Self {
        Self::Static(path.to_string())
    }
}

impl From<String> for MappingRule {
    fn from(path: String) -> Self {
        Self::Static(path)
    }
}

/// Wraps the coerced value as a single sub-component.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ComponentTarget {
    /// Destination field receiving the wrapper array.
    pub field: String,
    /// Component name of the wrapper.
    pub component: String,
    /// Field of the wrapper holding the value.
    pub component_field: String,
}

/// Where a mapped value goes.
#[derive(Clone)]
pub enum Target {
    /// Flat field name, or `content.<field>`.
    Field(String),
    /// Structured target wrapping the value in a sub-component.
    Component(ComponentTarget),
    /// Target chosen per record.
    Derived(Arc<dyn TargetResolver>),
}

impl Target {
    /// Output key of a static target. `None` for derived targets.
    pub fn field_name(&self) -> Option<&str> {
        match self {
            Self::Field(name) => Some(name),
            Self::Component(target) => Some(&target.field),
            Self::Derived(_) => None,
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.debug_tuple("Field").field(name).finish(),
            Self::Component(target) => f.debug_tuple("Component").field(target).finish(),
            Self::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Self::Field(name.to_string())
    }
}

impl From<ComponentTarget> for Target {
    fn from(target: ComponentTarget) -> Self {
        Self::Component(target)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TargetSpec {
    Field(String),
    Component(ComponentTarget),
}

impl From<TargetSpec> for Target {
    fn from(spec: TargetSpec) -> Self {
        match spec {
            TargetSpec::Field(name) => Self::Field(name),
            TargetSpec::Component(target) => Self::Component(target),
        }
    }
}

/// Ordered sequence of `(source, target)` pairs.
#[derive(Debug, Clone, Default)]
pub struct FieldMapping {
    entries: Vec<(MappingRule, Target)>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair, builder style.
    pub fn map(mut self, source: impl Into<MappingRule>, target: impl Into<Target>) -> Self {
        self.push(source, target);
        self
    }

    /// Append a derived source, builder style.
    pub fn derive(
        mut self,
        name: impl Into<String>,
        deriver: Arc<dyn FieldDeriver>,
        target: impl Into<Target>,
    ) -> Self {
        self.push(
            MappingRule::Derived {
                name: name.into(),
                deriver,
            },
            target,
        );
        self
    }

    pub fn push(&mut self, source: impl Into<MappingRule>, target: impl Into<Target>) {
        self.entries.push((source.into(), target.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = &(MappingRule, Target)> {
        self.entries.iter()
    }

    /// Target of the first static rule reading `source_path`.
    pub fn target_for(&self, source_path: &str) -> Option<&Target> {
        self.entries
            .iter()
            .find(|(rule, _)| matches!(rule, MappingRule::Static(path) if path == source_path))
            .map(|(_, target)| target)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'de> Deserialize<'de> for FieldMapping {
    /// Accepts either an object (`{"title": "name"}`, order preserved) or an
    /// array of `[source, target]` pairs.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let raw = Value::deserialize(deserializer)?;
        let pairs: Vec<(String, Value)> = match raw {
            Value::Object(map) => map.into_iter().collect(),
            Value::Array(items) => items
                .into_iter()
                .map(|item| serde_json::from_value::<(String, Value)>(item).map_err(D::Error::custom))
                .collect::<Result<_, _>>()?,
            other => {
                return Err(D::Error::custom(format!(
                    "schema mapping must be an object or an array of pairs, got {}",
                    other
                )))
            }
        };

        let mut mapping = FieldMapping::new();
        for (source, target) in pairs {
            let spec: TargetSpec = serde_json::from_value(target).map_err(D::Error::custom)?;
            mapping.push(MappingRule::Static(source), Target::from(spec));
        }
        Ok(mapping)
    }
}

/// How a taxonomy-bound field is finally written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipKind {
    /// Slugs are replaced by destination identifiers.
    #[default]
    Relationship,
    /// Slugs are kept as plain values.
    Value,
}

/// Declares that a source field holds ids of another source content type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaxonomyRef {
    /// Source content type holding the taxonomy records (`categories`).
    pub name: String,
    /// Source path of the referencing field (`categories`).
    pub field: String,
    #[serde(rename = "type", default)]
    pub kind: RelationshipKind,
}

/// Destination side of a taxonomy declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyBinding {
    /// Source content type the binding was declared on.
    pub source_content_type: String,
    /// Component of the referencing destination object.
    pub content_type: String,
    /// Destination field (without the `content.` prefix) holding the slugs.
    pub field: String,
    /// Component of the referenced taxonomy objects.
    pub taxonomy: String,
    pub kind: RelationshipKind,
}

/// Migration settings of one source content type.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentTypeConfig {
    /// Source content type name (`posts`).
    pub name: String,
    /// Destination component, defaults to `name`.
    #[serde(default)]
    pub new_content_type: Option<String>,
    /// Destination folder the entries are moved under.
    #[serde(default)]
    pub folder: Option<String>,
    pub schema_mapping: FieldMapping,
    #[serde(default)]
    pub taxonomies: Vec<TaxonomyRef>,
}

impl ContentTypeConfig {
    pub fn new(name: impl Into<String>, schema_mapping: FieldMapping) -> Self {
        Self {
            name: name.into(),
            new_content_type: None,
            folder: None,
            schema_mapping,
            taxonomies: Vec::new(),
        }
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.new_content_type = Some(component.into());
        self
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn with_taxonomy(mut self, taxonomy: TaxonomyRef) -> Self {
        self.taxonomies.push(taxonomy);
        self
    }

    /// Destination component created for this content type.
    pub fn component_name(&self) -> &str {
        self.new_content_type.as_deref().unwrap_or(&self.name)
    }

    /// Whether any taxonomy of this type points at `other`.
    pub fn references(&self, other: &str) -> bool {
        self.taxonomies.iter().any(|t| t.name == other)
    }

    /// Destination bindings for every taxonomy declared across `content_types`.
    ///
    /// Taxonomies whose content type is not configured, or whose source field
    /// has no mapping, produce no binding.
    pub fn taxonomy_bindings(content_types: &[ContentTypeConfig]) -> Vec<TaxonomyBinding> {
        let mut bindings = Vec::new();
        for content_type in content_types {
            for taxonomy in &content_type.taxonomies {
                let Some(taxonomy_type) = content_types.iter().find(|ct| ct.name == taxonomy.name)
                else {
                    continue;
                };
                let Some(field) = content_type
                    .schema_mapping
                    .target_for(&taxonomy.field)
                    .and_then(Target::field_name)
                else {
                    continue;
                };
                bindings.push(TaxonomyBinding {
                    source_content_type: content_type.name.clone(),
                    content_type: content_type.component_name().to_string(),
                    field: field.strip_prefix(CONTENT_PREFIX).unwrap_or(field).to_string(),
                    taxonomy: taxonomy_type.component_name().to_string(),
                    kind: taxonomy.kind,
                });
            }
        }
        bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Constant(Value);

    #[async_trait]
    impl FieldDeriver for Constant {
        async fn derive(&self, _record: &SourceRecord) -> Option<Value> {
            Some(self.0.clone())
        }
    }

    #[test]
    fn test_mapping_from_object_keeps_order() {
        let mapping: FieldMapping = serde_json::from_value(json!({
            "title": "name",
            "slug": "slug",
            "content": "content.body",
            "excerpt": {"field": "content.teaser", "component": "teaser", "component_field": "text"}
        }))
        .unwrap();

        let sources: Vec<&str> = mapping.iter().map(|(rule, _)| rule.name()).collect();
        assert_eq!(sources, vec!["title", "slug", "content", "excerpt"]);
        assert!(matches!(mapping.target_for("excerpt"), Some(Target::Component(_))));
    }

    #[test]
    fn test_mapping_from_pairs() {
        let mapping: FieldMapping =
            serde_json::from_value(json!([["date", "first_published_at"], ["title", "name"]]))
                .unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(
            mapping.target_for("date").and_then(Target::field_name),
            Some("first_published_at")
        );
    }

    #[test]
    fn test_mapping_rejects_scalar() {
        let result: Result<FieldMapping, _> = serde_json::from_value(json!("title"));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_derived_rule() {
        let mapping = FieldMapping::new().derive(
            "constant",
            Arc::new(Constant(json!("fixed"))),
            "content.kind",
        );
        let (rule, _) = mapping.iter().next().unwrap();
        match rule {
            MappingRule::Derived { name, deriver } => {
                assert_eq!(name, "constant");
                assert_eq!(deriver.derive(&json!({})).await, Some(json!("fixed")));
            }
            MappingRule::Static(_) => panic!("Expected derived rule"),
        }
    }

    #[test]
    fn test_taxonomy_bindings() {
        let posts = ContentTypeConfig::new(
            "posts",
            FieldMapping::new()
                .map("title", "name")
                .map("categories", "content.categories"),
        )
        .with_component("post")
        .with_taxonomy(TaxonomyRef {
            name: "categories".to_string(),
            field: "categories".to_string(),
            kind: RelationshipKind::Relationship,
        });
        let categories =
            ContentTypeConfig::new("categories", FieldMapping::new().map("name", "name"))
                .with_component("category");

        let bindings = ContentTypeConfig::taxonomy_bindings(&[posts, categories]);
        assert_eq!(
            bindings,
            vec![TaxonomyBinding {
                source_content_type: "posts".to_string(),
                content_type: "post".to_string(),
                field: "categories".to_string(),
                taxonomy: "category".to_string(),
                kind: RelationshipKind::Relationship,
            }]
        );
    }

    #[test]
    fn test_taxonomy_without_config_has_no_binding() {
        let posts = ContentTypeConfig::new("posts", FieldMapping::new().map("tags", "content.tags"))
            .with_taxonomy(TaxonomyRef {
                name: "tags".to_string(),
                field: "tags".to_string(),
                kind: RelationshipKind::Value,
            });
        assert!(ContentTypeConfig::taxonomy_bindings(&[posts]).is_empty());
    }
}
