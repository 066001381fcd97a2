//! Migration queue types.
//!
//! A [`MigrationEntry`] is the draft of one destination story. It is created by
//! the field mapper, rewritten in place by the asset subsystem and completed
//! with its parent folder by the loader before it is submitted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::visit_strings_mut;

/// Draft of one destination story.
///
/// `source_path` and `source_folder_path` are scaffolding used while planning
/// folders; they are never serialized into the submitted payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationEntry {
    pub name: String,
    pub slug: String,
    /// Component fields, including the `component` key itself.
    pub content: Map<String, Value>,
    /// Additional top level fields (`first_published_at`, ...).
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent_id: Option<u64>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub is_startpage: bool,
    #[serde(skip)]
    pub source_path: String,
    #[serde(skip)]
    pub source_folder_path: Option<String>,
}

impl MigrationEntry {
    pub fn new(name: impl Into<String>, slug: impl Into<String>, component: &str) -> Self {
        let mut content = Map::new();
        content.insert("component".to_string(), Value::String(component.to_string()));
        Self {
            name: name.into(),
            slug: slug.into(),
            content,
            ..Default::default()
        }
    }

    /// Component name stored under `content.component`.
    pub fn component(&self) -> Option<&str> {
        self.content.get("component").and_then(Value::as_str)
    }

    /// Merge the output of the field mapper into this entry.
    ///
    /// String `name`/`slug` keys override the defaults, the `content` object is
    /// merged key by key and every other key lands in [`Self::fields`].
    pub fn merge_mapped(&mut self, mapped: Map<String, Value>) {
        for (key, value) in mapped {
            match (key.as_str(), value) {
                ("name", Value::String(name)) => self.name = name,
                ("slug", Value::String(slug)) => self.slug = slug,
                ("content", Value::Object(content)) => self.content.extend(content),
                ("name" | "slug" | "content", _) => {}
                (_, value) => {
                    self.fields.insert(key, value);
                }
            }
        }
    }

    /// Visit every string leaf of the payload (name, slug, content, fields).
    pub fn for_each_string_mut(&mut self, f: &mut dyn FnMut(&mut String)) {
        f(&mut self.name);
        f(&mut self.slug);
        for value in self.content.values_mut() {
            visit_strings_mut(value, f);
        }
        for value in self.fields.values_mut() {
            visit_strings_mut(value, f);
        }
    }

    /// Payload submitted to the destination, scaffolding stripped.
    pub fn to_payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A destination folder to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderDescriptor {
    /// Source path of the folder (`/blog/news/`).
    pub path: String,
    pub name: String,
    pub slug: String,
    /// Path of the parent folder when deeper than one segment.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent: Option<String>,
    /// Destination id once created.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<u64>,
}

/// An asset discovered in the migration queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetReference {
    /// URL exactly as found in the queue.
    pub original_url: String,
    /// Absolute URL used for downloading.
    pub resolved_url: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub new_url: Option<String>,
}

impl AssetReference {
    pub fn new(original_url: impl Into<String>, resolved_url: impl Into<String>) -> Self {
        Self {
            original_url: original_url.into(),
            resolved_url: resolved_url.into(),
            new_url: None,
        }
    }
}

/// A successfully uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedAsset {
    pub original_url: String,
    pub new_url: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_strips_scaffolding() {
        let mut entry = MigrationEntry::new("Hello", "hello", "post");
        entry.source_path = "/posts/hello/".to_string();
        entry.source_folder_path = Some("/posts/".to_string());
        entry.parent_id = Some(7);

        let payload = entry.to_payload();
        assert_eq!(
            payload,
            json!({
                "name": "Hello",
                "slug": "hello",
                "content": {"component": "post"},
                "parent_id": 7
            })
        );
    }

    #[test]
    fn test_startpage_is_serialized_when_set() {
        let mut entry = MigrationEntry::new("Index", "index", "page");
        entry.is_startpage = true;
        assert_eq!(entry.to_payload()["is_startpage"], json!(true));
    }

    #[test]
    fn test_merge_mapped() {
        let mut entry = MigrationEntry::new("Default", "default", "post");
        let mapped = json!({
            "name": "Mapped",
            "first_published_at": "2023-01-01",
            "content": {"body": "text"}
        });
        entry.merge_mapped(mapped.as_object().unwrap().clone());

        assert_eq!(entry.name, "Mapped");
        assert_eq!(entry.slug, "default");
        assert_eq!(entry.component(), Some("post"));
        assert_eq!(entry.content["body"], json!("text"));
        assert_eq!(entry.fields["first_published_at"], json!("2023-01-01"));
    }

    #[test]
    fn test_for_each_string_mut_reaches_nested_leaves() {
        let mut entry = MigrationEntry::new("a", "b", "post");
        entry
            .content
            .insert("body".to_string(), json!([{"component": "image", "src": "x"}]));
        let mut count = 0;
        entry.for_each_string_mut(&mut |s: &mut String| {
            count += 1;
            s.make_ascii_uppercase();
        });
        assert_eq!(count, 5);
        assert_eq!(entry.content["body"][0]["src"], json!("X"));
    }
}
