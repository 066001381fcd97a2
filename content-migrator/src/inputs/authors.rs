//! Author URL to slug mapping.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use content_migrator_shared::utils::{descendant, normalize_path};
use content_migrator_shared::{FieldDeriver, SourceRecord};
use serde_json::Value;
use tracing::{debug, info};

use crate::errors::MigrationError;
use crate::inputs::url_path;

/// Old author page URLs mapped to new author slugs.
///
/// One pair per line, separated by whitespace, a comma or a tab. Blank lines
/// and lines starting with `#` are ignored. URLs are compared by path.
#[derive(Debug, Clone, Default)]
pub struct AuthorMap {
    slugs: HashMap<String, String>,
}

impl AuthorMap {
    pub fn from_file(path: &Path) -> Result<Self, MigrationError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MigrationError::input(format!("cannot read author map {}: {}", path.display(), e))
        })?;
        let map = Self::parse(&raw)?;
        info!(count = map.len(), path = %path.display(), "Loaded author map");
        Ok(map)
    }

    pub fn parse(raw: &str) -> Result<Self, MigrationError> {
        let mut slugs = HashMap::new();
        for (number, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|p| !p.is_empty());
            match (parts.next(), parts.next()) {
                (Some(old_url), Some(new_slug)) => {
                    slugs.insert(Self::key(old_url), new_slug.to_string());
                }
                _ => {
                    return Err(MigrationError::input(format!(
                        "author map line {} needs an old URL and a new slug",
                        number + 1
                    )))
                }
            }
        }
        Ok(Self { slugs })
    }

    fn key(url: &str) -> String {
        normalize_path(&url_path(url)).to_string()
    }

    /// New slug of the author at `old_url`.
    pub fn get(&self, old_url: &str) -> Option<&str> {
        self.slugs.get(&Self::key(old_url)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.slugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slugs.is_empty()
    }
}

/// Derives the new author slug from a record field holding the old author URL.
pub struct AuthorDeriver {
    map: Arc<AuthorMap>,
    field: String,
}

impl AuthorDeriver {
    pub fn new(map: Arc<AuthorMap>, field: impl Into<String>) -> Self {
        Self {
            map,
            field: field.into(),
        }
    }
}

#[async_trait]
impl FieldDeriver for AuthorDeriver {
    async fn derive(&self, record: &SourceRecord) -> Option<Value> {
        let old_url = descendant(record, &self.field)?.as_str()?;
        match self.map.get(old_url) {
            Some(slug) => Some(Value::String(slug.to_string())),
            None => {
                debug!(url = old_url, "Author not in author map");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MAP: &str = "# old new\n\
        https://example.com/author/jane/ jane-doe\n\
        https://example.com/author/bob,bob-smith\n\
        \n\
        /author/ann/\tann\n";

    #[test]
    fn test_parse_separators_and_comments() {
        let map = AuthorMap::parse(MAP).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("https://example.com/author/jane"), Some("jane-doe"));
        assert_eq!(map.get("https://other.com/author/bob/"), Some("bob-smith"));
        assert_eq!(map.get("/author/ann"), Some("ann"));
        assert_eq!(map.get("/author/zed/"), None);
    }

    #[test]
    fn test_incomplete_line_is_rejected() {
        assert!(matches!(
            AuthorMap::parse("https://example.com/author/jane/\n"),
            Err(MigrationError::Input(_))
        ));
    }

    #[tokio::test]
    async fn test_deriver_maps_record_link() {
        let deriver = AuthorDeriver::new(Arc::new(AuthorMap::parse(MAP).unwrap()), "link");
        let record = json!({"id": 2, "link": "https://example.com/author/jane/"});
        assert_eq!(deriver.derive(&record).await, Some(json!("jane-doe")));
        assert_eq!(deriver.derive(&json!({"link": "https://example.com/author/x/"})).await, None);
    }
}
