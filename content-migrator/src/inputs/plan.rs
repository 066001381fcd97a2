//! Migration plan: per-URL renames and metadata overrides.

use std::io::Read;
use std::path::Path;

use content_migrator_shared::utils::{compare_slugs, folder_of, last_segment, normalize_path};
use content_migrator_shared::MigrationEntry;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::errors::MigrationError;
use crate::inputs::url_path;

/// One row of the plan.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlanRow {
    pub old_url: String,
    #[serde(default)]
    pub new_url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Rows of a CSV file with the header `old_url,new_url,title,description`.
#[derive(Debug, Clone, Default)]
pub struct MigrationPlan {
    rows: Vec<PlanRow>,
}

impl MigrationPlan {
    pub fn from_file(path: &Path) -> Result<Self, MigrationError> {
        let file = std::fs::File::open(path).map_err(|e| {
            MigrationError::input(format!("cannot open migration plan {}: {}", path.display(), e))
        })?;
        let plan = Self::from_reader(file)?;
        info!(rows = plan.len(), path = %path.display(), "Loaded migration plan");
        Ok(plan)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, MigrationError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let rows = csv_reader
            .deserialize::<PlanRow>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rows })
    }

    /// Row whose old URL has the same path as `path`.
    pub fn find(&self, path: &str) -> Option<&PlanRow> {
        self.rows
            .iter()
            .find(|row| compare_slugs(&url_path(&row.old_url), path))
    }

    /// Apply the matching row to `entry`, if any.
    ///
    /// A non-empty `new_url` moves the entry: its path, slug and folder are
    /// recomputed from it. A non-empty title replaces the name. Title and
    /// description are also written into the given content fields.
    pub fn apply(
        &self,
        entry: &mut MigrationEntry,
        title_field: Option<&str>,
        description_field: Option<&str>,
    ) -> bool {
        let Some(row) = self.find(&entry.source_path) else {
            return false;
        };

        if !row.new_url.is_empty() {
            let new_path = format!("/{}/", normalize_path(&url_path(&row.new_url)));
            if let Some(slug) = last_segment(&new_path) {
                entry.slug = slug.to_string();
            }
            entry.source_folder_path = folder_of(&new_path, false);
            debug!(from = %entry.source_path, to = %new_path, "Entry moved by migration plan");
            entry.source_path = new_path;
        }

        if !row.title.is_empty() {
            entry.name = row.title.clone();
            if let Some(field) = title_field {
                entry
                    .content
                    .insert(field.to_string(), Value::String(row.title.clone()));
            }
        }
        if let (Some(field), false) = (description_field, row.description.is_empty()) {
            entry
                .content
                .insert(field.to_string(), Value::String(row.description.clone()));
        }
        true
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
