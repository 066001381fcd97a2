//! External inputs produced outside the migration run.
//!
//! - [`TableLibrary`]: a directory of exported tables, turned into
//!   destination table blocks.
//! - [`AuthorMap`]: old author URLs mapped to new author slugs.
//! - [`MigrationPlan`]: per-URL renames and metadata overrides.

mod authors;
mod plan;
mod tables;

pub use authors::{AuthorDeriver, AuthorMap};
pub use plan::{MigrationPlan, PlanRow};
pub use tables::{TableBlockTransformer, TableExport, TableLibrary, TABLEPRESS_BLOCK};

use url::Url;

/// Path of an absolute or site-rooted URL (`https://x.com/a/?p=1` -> `/a/`).
pub(crate) fn url_path(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => url.path().to_string(),
        Err(_) => raw
            .split(['?', '#'])
            .next()
            .unwrap_or(raw)
            .to_string(),
    }
}
