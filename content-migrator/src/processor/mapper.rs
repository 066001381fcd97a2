//! Field mapper.
//!
//! Turns a source record into a destination-shaped object by walking a
//! [`FieldMapping`] in declared order. Every mapped value is coerced according
//! to the type the destination schema declares for its target field; block
//! arrays recurse through [`FieldMapper::expand_blocks`], which in turn maps
//! each block through the same machinery.

use std::sync::Arc;

use content_migrator_repository::{ComponentSchemas, SchemaLookup};
use content_migrator_shared::types::mapping::CONTENT_PREFIX;
use content_migrator_shared::utils::descendant;
use content_migrator_shared::{
    is_falsy, FieldMapping, FieldType, MappingRule, SourceRecord, Target, TaxonomyRef,
};
use content_migrator_source::SourceAdapter;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::processor::blocks::{block_name, BlockRegistry, BLOCK_ATTRS_KEY};
use crate::processor::markup::{html_to_markdown, strip_tags};
use crate::processor::richtext::markdown_to_richtext;

/// Maps source records and block trees onto destination components.
pub struct FieldMapper {
    source: Arc<SourceAdapter>,
    schemas: Arc<ComponentSchemas>,
    blocks: Arc<BlockRegistry>,
}

impl FieldMapper {
    pub fn new(
        source: Arc<SourceAdapter>,
        schemas: Arc<ComponentSchemas>,
        blocks: Arc<BlockRegistry>,
    ) -> Self {
        Self {
            source,
            schemas,
            blocks,
        }
    }

    /// Source adapter used to read field values.
    pub fn source(&self) -> &SourceAdapter {
        &self.source
    }

    pub fn schemas(&self) -> &ComponentSchemas {
        &self.schemas
    }

    /// Map `record` onto `component`.
    ///
    /// Absent source values are skipped. Falsy values (`null`, `false`, `0`,
    /// `""`) are written as they are, without coercion. Targets prefixed with
    /// `content.` are nested under the `content` key of the result.
    ///
    /// Only values read from a rendered form (`{rendered: ..}`) lose their
    /// markup when bound to a plain text field; raw strings are kept as is.
    pub fn populate_fields<'a>(
        &'a self,
        record: &'a SourceRecord,
        component: &'a str,
        mapping: &'a FieldMapping,
        taxonomies: &'a [TaxonomyRef],
    ) -> BoxFuture<'a, Map<String, Value>> {
        async move {
            let mut output = Map::new();

            for (rule, target) in mapping.iter() {
                let rendered = match rule {
                    MappingRule::Static(path) => is_rendered(record, path),
                    MappingRule::Derived { .. } => false,
                };
                let value = match rule {
                    MappingRule::Static(path) => match self.source.field_value(record, path).await {
                        Some(value) => {
                            self.source
                                .resolve_taxonomy_value(taxonomies, value, path)
                                .await
                        }
                        None => continue,
                    },
                    MappingRule::Derived { deriver, .. } => match deriver.derive(record).await {
                        Some(value) => value,
                        None => continue,
                    },
                };

                let target = match target {
                    Target::Derived(resolver) => resolver.resolve(record).await,
                    other => other.clone(),
                };
                let Some(field) = target.field_name().map(str::to_string) else {
                    debug!(
                        source = rule.name(),
                        "Target resolver returned another resolver, skipping field"
                    );
                    continue;
                };

                let value = if is_falsy(&value) {
                    value
                } else {
                    self.format_value(value, &target, component, rendered).await
                };
                insert_field(&mut output, &field, value);
            }

            output
        }
        .boxed()
    }

    /// Coerce `value` to the declared type of `target` on `component`.
    ///
    /// Structured targets look up `component.component_field` and wrap the
    /// coerced value in a single sub-component.
    pub fn format_for_destination<'a>(
        &'a self,
        value: Value,
        target: &'a Target,
        component: &'a str,
    ) -> BoxFuture<'a, Value> {
        self.format_value(value, target, component, false)
    }

    fn format_value<'a>(
        &'a self,
        value: Value,
        target: &'a Target,
        component: &'a str,
        rendered: bool,
    ) -> BoxFuture<'a, Value> {
        async move {
            let (schema_component, field) = match target {
                Target::Field(field) => (component, field.as_str()),
                Target::Component(structured) => (
                    structured.component.as_str(),
                    structured.component_field.as_str(),
                ),
                Target::Derived(_) => return value,
            };

            let field_type = match self.schemas.lookup(schema_component, field) {
                SchemaLookup::Found(field_type) => field_type,
                SchemaLookup::MissingComponent => {
                    warn!(
                        component = schema_component,
                        field = field,
                        "Component not defined in destination, treating field as text"
                    );
                    FieldType::Text
                }
                SchemaLookup::MissingField => FieldType::Text,
            };

            let coerced = self.coerce(value, &field_type, rendered).await;

            match target {
                Target::Component(structured) => {
                    let mut wrapper = Map::new();
                    wrapper.insert(
                        "component".to_string(),
                        Value::String(structured.component.clone()),
                    );
                    wrapper.insert(structured.component_field.clone(), coerced);
                    Value::Array(vec![Value::Object(wrapper)])
                }
                _ => coerced,
            }
        }
        .boxed()
    }

    async fn coerce(&self, value: Value, field_type: &FieldType, rendered: bool) -> Value {
        match (field_type, value) {
            (FieldType::Text | FieldType::Textarea, Value::String(s)) if rendered => {
                Value::String(strip_tags(&s))
            }
            (FieldType::Options, Value::Array(items)) => Value::Array(items),
            (FieldType::Options, scalar) => Value::Array(vec![scalar]),
            (FieldType::RichText, Value::String(s)) => markdown_to_richtext(&html_to_markdown(&s)),
            (FieldType::Markdown, Value::String(s)) => Value::String(html_to_markdown(&s)),
            (FieldType::MultiLink, Value::String(url)) => json!({
                "url": url,
                "linktype": "url",
                "fieldtype": "multilink",
                "cached_url": url,
            }),
            (FieldType::Bloks, Value::Array(blocks)) => Value::Array(self.expand_blocks(blocks).await),
            (FieldType::Bloks, other) => {
                warn!("Block field value is not an array, passing it through");
                other
            }
            (FieldType::Asset, Value::String(filename)) => json!({
                "filename": filename,
                "fieldtype": "asset",
            }),
            (_, other) => other,
        }
    }

    /// Convert a sequence of source blocks into destination blocks.
    ///
    /// Ignored block types are dropped, custom transformers are used
    /// verbatim, declarative mappings are populated from the block itself and
    /// unmapped types fall back to `{component: blockName, ...attrs}`.
    pub fn expand_blocks<'a>(&'a self, blocks: Vec<Value>) -> BoxFuture<'a, Vec<Value>> {
        async move {
            let mut expanded = Vec::with_capacity(blocks.len());

            for block in blocks {
                let Some(name) = block_name(&block) else {
                    debug!("Dropping block without a type");
                    continue;
                };

                match self.blocks.get(name) {
                    Some(mapping) if mapping.ignore => {}
                    Some(mapping) => match &mapping.transformer {
                        Some(transformer) => expanded.push(transformer.transform(&block, self).await),
                        None => {
                            let component = mapping.component_name();
                            let mut mapped = self
                                .populate_fields(&block, component, &mapping.schema_mapping, &[])
                                .await;
                            mapped.insert(
                                "component".to_string(),
                                Value::String(component.to_string()),
                            );
                            expanded.push(Value::Object(mapped));
                        }
                    },
                    None => expanded.push(passthrough(name, &block)),
                }
            }

            expanded
        }
        .boxed()
    }
}

/// Whether the value at `path` is a rendered object.
fn is_rendered(record: &SourceRecord, path: &str) -> bool {
    matches!(descendant(record, path), Some(Value::Object(map)) if map.contains_key("rendered"))
}

/// Generic conversion of an unmapped block: its type becomes the component
/// and its native attributes are copied as they are.
fn passthrough(name: &str, block: &Value) -> Value {
    let mut component = Map::new();
    component.insert("component".to_string(), Value::String(name.to_string()));
    if let Some(Value::Object(attrs)) = block.get(BLOCK_ATTRS_KEY) {
        for (key, value) in attrs {
            component.insert(key.clone(), value.clone());
        }
    }
    Value::Object(component)
}

fn insert_field(output: &mut Map<String, Value>, field: &str, value: Value) {
    match field.strip_prefix(CONTENT_PREFIX) {
        Some(content_field) => {
            let content = output
                .entry("content".to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(content) = content {
                content.insert(content_field.to_string(), value);
            }
        }
        None => {
            output.insert(field.to_string(), value);
        }
    }
}
