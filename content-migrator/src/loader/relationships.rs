//! Relationship resolution.
//!
//! Taxonomy-bound fields hold slugs once mapped. Right before an entry is
//! created, those slugs are replaced by the uuids of the destination stories
//! they point at.

use std::sync::Arc;

use content_migrator_repository::DestinationService;
use content_migrator_shared::{MigrationEntry, RelationshipKind, TaxonomyBinding};
use serde_json::Value;
use tracing::{debug, warn};

/// Resolves slugs of taxonomy-bound fields into destination uuids.
pub struct RelationshipResolver {
    destination: Arc<DestinationService>,
    bindings: Vec<TaxonomyBinding>,
}

impl RelationshipResolver {
    pub fn new(destination: Arc<DestinationService>, bindings: Vec<TaxonomyBinding>) -> Self {
        Self {
            destination,
            bindings,
        }
    }

    pub fn bindings(&self) -> &[TaxonomyBinding] {
        &self.bindings
    }

    /// Resolve every relationship field of `entry` in place.
    ///
    /// Returns the number of slugs left unresolved.
    pub async fn resolve_entry(&self, entry: &mut MigrationEntry) -> usize {
        let Some(component) = entry.component().map(str::to_string) else {
            return 0;
        };

        let mut unresolved = 0;
        for binding in &self.bindings {
            if binding.content_type != component || binding.kind != RelationshipKind::Relationship {
                continue;
            }
            let Some(value) = entry.content.get(&binding.field).cloned() else {
                continue;
            };
            let (resolved, missed) = self.resolve_value(value, binding).await;
            unresolved += missed;
            entry.content.insert(binding.field.clone(), resolved);
        }
        unresolved
    }

    /// Resolve a slug or a sequence of slugs. Values that are not slugs and
    /// slugs without a matching story are kept as they are.
    pub async fn resolve_value(&self, value: Value, binding: &TaxonomyBinding) -> (Value, usize) {
        match value {
            Value::String(slug) => match self.resolve_slug(&slug, &binding.taxonomy).await {
                Some(uuid) => (Value::String(uuid), 0),
                None => (Value::String(slug), 1),
            },
            Value::Array(items) => {
                let mut missed = 0;
                let mut resolved = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(slug) => match self.resolve_slug(&slug, &binding.taxonomy).await {
                            Some(uuid) => resolved.push(Value::String(uuid)),
                            None => {
                                missed += 1;
                                resolved.push(Value::String(slug));
                            }
                        },
                        other => resolved.push(other),
                    }
                }
                (Value::Array(resolved), missed)
            }
            other => (other, 0),
        }
    }

    /// Uuid of the `taxonomy` story with `slug`: stories created earlier in
    /// this run first, then a destination lookup.
    async fn resolve_slug(&self, slug: &str, taxonomy: &str) -> Option<String> {
        if let Some(uuid) = self.destination.created_uuid(slug, taxonomy).await {
            debug!(slug = slug, taxonomy = taxonomy, "Relationship resolved from session");
            return Some(uuid);
        }

        match self.destination.find_story_uuid(slug, taxonomy).await {
            Ok(Some(uuid)) => Some(uuid),
            Ok(None) => {
                warn!(slug = slug, taxonomy = taxonomy, "Unresolved relationship");
                None
            }
            Err(e) => {
                warn!(
                    slug = slug,
                    taxonomy = taxonomy,
                    error = %e,
                    "Relationship lookup failed"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use content_migrator_repository::MockDestination;
    use serde_json::json;

    fn binding(kind: RelationshipKind) -> TaxonomyBinding {
        TaxonomyBinding {
            source_content_type: "posts".to_string(),
            content_type: "post".to_string(),
            field: "authors".to_string(),
            taxonomy: "author".to_string(),
            kind,
        }
    }

    fn post(authors: Value) -> MigrationEntry {
        let mut entry = MigrationEntry::new("Post", "post", "post");
        entry.content.insert("authors".to_string(), authors);
        entry
    }

    #[tokio::test]
    async fn test_session_story_resolves_without_lookup() {
        let mock = Arc::new(MockDestination::new());
        let destination = Arc::new(DestinationService::new(mock.clone()));
        let alice = destination
            .create_story(&json!({"name": "Alice", "slug": "alice", "content": {"component": "author"}}))
            .await
            .unwrap();

        let resolver = RelationshipResolver::new(
            destination.clone(),
            vec![binding(RelationshipKind::Relationship)],
        );
        let mut entry = post(json!("alice"));
        assert_eq!(resolver.resolve_entry(&mut entry).await, 0);
        assert_eq!(entry.content["authors"], json!(alice.uuid));
        assert_eq!(mock.story_lookups(), 0);
    }

    #[tokio::test]
    async fn test_unresolved_slugs_are_kept() {
        let mock = Arc::new(MockDestination::new());
        let destination = Arc::new(DestinationService::new(mock.clone()));
        let resolver = RelationshipResolver::new(
            destination,
            vec![binding(RelationshipKind::Relationship)],
        );

        let mut entry = post(json!(["bob", 3]));
        assert_eq!(resolver.resolve_entry(&mut entry).await, 1);
        assert_eq!(entry.content["authors"], json!(["bob", 3]));
        assert_eq!(mock.story_lookups(), 1);
    }

    #[tokio::test]
    async fn test_value_kind_is_left_alone() {
        let mock = Arc::new(MockDestination::new());
        let destination = Arc::new(DestinationService::new(mock.clone()));
        let resolver = RelationshipResolver::new(destination, vec![binding(RelationshipKind::Value)]);

        let mut entry = post(json!("alice"));
        assert_eq!(resolver.resolve_entry(&mut entry).await, 0);
        assert_eq!(entry.content["authors"], json!("alice"));
        assert_eq!(mock.story_lookups(), 0);
    }
}
