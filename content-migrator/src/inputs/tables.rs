//! Exported tables.
//!
//! Table plugins keep their data out of the REST API, so tables are exported
//! beforehand as one JSON file per table and loaded from a directory. Blocks
//! referencing a table by id are replaced by a destination table block.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::errors::MigrationError;
use crate::processor::blocks::BLOCK_ATTRS_KEY;
use crate::processor::{BlockTransformer, FieldMapper};

/// Block type of an embedded table.
pub const TABLEPRESS_BLOCK: &str = "tablepress/table";

#[derive(Debug, Clone, Default, Deserialize)]
struct TableOptions {
    #[serde(default)]
    table_head: Value,
}

/// One exported table.
#[derive(Debug, Clone, Deserialize)]
pub struct TableExport {
    id: Value,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    data: Vec<Vec<Value>>,
    #[serde(default)]
    options: TableOptions,
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn id_key(id: &Value) -> Option<String> {
    match id {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl TableExport {
    pub fn id(&self) -> Option<String> {
        id_key(&self.id)
    }

    /// Whether the first row is a header row. Exports store the flag as a
    /// boolean, a number or a string.
    pub fn has_head(&self) -> bool {
        match &self.options.table_head {
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
            Value::String(s) => matches!(s.as_str(), "1" | "true"),
            _ => false,
        }
    }

    pub fn rows(&self) -> Vec<Vec<String>> {
        self.data
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect()
    }

    /// Destination table field value.
    pub fn to_table(&self) -> Value {
        let mut rows = self.rows();
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        let head = if self.has_head() && !rows.is_empty() {
            rows.remove(0)
        } else {
            vec![String::new(); columns]
        };

        let thead: Vec<Value> = head
            .into_iter()
            .map(|value| json!({ "component": "_table_head", "value": value }))
            .collect();
        let tbody: Vec<Value> = rows
            .into_iter()
            .map(|row| {
                let body: Vec<Value> = row
                    .into_iter()
                    .map(|value| json!({ "component": "_table_col", "value": value }))
                    .collect();
                json!({ "component": "_table_row", "body": body })
            })
            .collect();

        json!({ "fieldtype": "table", "thead": thead, "tbody": tbody })
    }
}

/// Every exported table, by id.
#[derive(Debug, Clone, Default)]
pub struct TableLibrary {
    tables: HashMap<String, TableExport>,
}

impl TableLibrary {
    /// Load every `*.json` file of `dir`. Files that do not parse as a table
    /// export are logged and skipped.
    pub fn load_dir(dir: &Path) -> Result<Self, MigrationError> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            MigrationError::input(format!("cannot read table exports {}: {}", dir.display(), e))
        })?;

        let mut tables = HashMap::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|raw| serde_json::from_str::<TableExport>(&raw).map_err(|e| e.to_string()));
            match parsed {
                Ok(table) => match table.id() {
                    Some(id) => {
                        tables.insert(id, table);
                    }
                    None => warn!(path = %path.display(), "Table export without id"),
                },
                Err(e) => warn!(path = %path.display(), error = %e, "Invalid table export"),
            }
        }

        info!(count = tables.len(), dir = %dir.display(), "Loaded table exports");
        Ok(Self { tables })
    }

    pub fn from_tables(tables: impl IntoIterator<Item = TableExport>) -> Self {
        Self {
            tables: tables
                .into_iter()
                .filter_map(|t| t.id().map(|id| (id, t)))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&TableExport> {
        self.tables.get(id)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Replaces table blocks (`attrs.id`) with a destination table component.
pub struct TableBlockTransformer {
    library: Arc<TableLibrary>,
    component: String,
}

impl TableBlockTransformer {
    pub fn new(library: Arc<TableLibrary>, component: impl Into<String>) -> Self {
        Self {
            library,
            component: component.into(),
        }
    }
}

#[async_trait]
impl BlockTransformer for TableBlockTransformer {
    async fn transform(&self, block: &Value, _mapper: &FieldMapper) -> Value {
        let attrs = block.get(BLOCK_ATTRS_KEY);
        let table = attrs
            .and_then(|a| a.get("id"))
            .and_then(id_key)
            .and_then(|id| self.library.get(&id));

        match table {
            Some(table) => json!({
                "component": self.component,
                "table": table.to_table(),
            }),
            None => {
                warn!(attrs = ?attrs, "Table export not found, keeping block attributes");
                let mut fallback = json!({ "component": self.component });
                if let (Some(Value::Object(attrs)), Value::Object(out)) = (attrs, &mut fallback) {
                    for (key, value) in attrs {
                        out.insert(key.clone(), value.clone());
                    }
                }
                fallback
            }
        }
    }
}
