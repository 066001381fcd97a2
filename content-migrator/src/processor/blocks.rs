//! Block mappings.
//!
//! Source bodies carry trees of blocks (`{blockName, attrs, innerBlocks}`).
//! Each block type can be dropped, mapped declaratively onto a destination
//! component or handed to a custom [`BlockTransformer`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use content_migrator_shared::FieldMapping;
use serde_json::Value;

use crate::processor::mapper::FieldMapper;

/// Key holding the block type of a source block.
pub const BLOCK_NAME_KEY: &str = "blockName";

/// Key holding the native attributes of a source block.
pub const BLOCK_ATTRS_KEY: &str = "attrs";

/// Custom conversion of one block type.
///
/// The result is used verbatim. Implementations may call back into the
/// mapper (`populate_fields`, `expand_blocks`) to convert nested content.
#[async_trait]
pub trait BlockTransformer: Send + Sync {
    async fn transform(&self, block: &Value, mapper: &FieldMapper) -> Value;
}

/// How one source block type is converted.
#[derive(Clone)]
pub struct BlockMapping {
    /// Source block type (`core/image`).
    pub name: String,
    /// Destination component, defaults to `name`.
    pub new_block_name: Option<String>,
    pub schema_mapping: FieldMapping,
    /// Drop blocks of this type.
    pub ignore: bool,
    pub transformer: Option<Arc<dyn BlockTransformer>>,
}

impl BlockMapping {
    pub fn new(name: impl Into<String>, schema_mapping: FieldMapping) -> Self {
        Self {
            name: name.into(),
            new_block_name: None,
            schema_mapping,
            ignore: false,
            transformer: None,
        }
    }

    pub fn ignored(name: impl Into<String>) -> Self {
        Self {
            ignore: true,
            ..Self::new(name, FieldMapping::new())
        }
    }

    pub fn with_transformer(name: impl Into<String>, transformer: Arc<dyn BlockTransformer>) -> Self {
        Self {
            transformer: Some(transformer),
            ..Self::new(name, FieldMapping::new())
        }
    }

    pub fn renamed(mut self, component: impl Into<String>) -> Self {
        self.new_block_name = Some(component.into());
        self
    }

    /// Destination component produced by this mapping.
    pub fn component_name(&self) -> &str {
        self.new_block_name.as_deref().unwrap_or(&self.name)
    }
}

impl fmt::Debug for BlockMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockMapping")
            .field("name", &self.name)
            .field("new_block_name", &self.new_block_name)
            .field("schema_mapping", &self.schema_mapping)
            .field("ignore", &self.ignore)
            .field("transformer", &self.transformer.is_some())
            .finish()
    }
}

/// Block mappings indexed by source block type. Later mappings of the same
/// type replace earlier ones.
#[derive(Debug, Clone, Default)]
pub struct BlockRegistry {
    mappings: HashMap<String, BlockMapping>,
}

impl BlockRegistry {
    pub fn new(mappings: impl IntoIterator<Item = BlockMapping>) -> Self {
        Self {
            mappings: mappings
                .into_iter()
                .map(|m| (m.name.clone(), m))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&BlockMapping> {
        self.mappings.get(name)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

/// Block type of a source block. Freeform blocks have a `null` name.
pub fn block_name(block: &Value) -> Option<&str> {
    block.get(BLOCK_NAME_KEY).and_then(Value::as_str)
}
