//! # Content Migrator Shared
//!
//! This crate defines the data structures shared by every stage of the content
//! migrator: source records, declarative mapping tables, migration entries,
//! folder descriptors and asset references, plus the path/slug utilities used
//! to compare source paths against destination slugs.

pub mod types;
pub mod utils;

pub use types::entry::{AssetReference, FolderDescriptor, MigrationEntry, UploadedAsset};
pub use types::mapping::{
    ComponentTarget, ContentTypeConfig, FieldDeriver, FieldMapping, MappingRule, RelationshipKind,
    Target, TargetResolver, TaxonomyBinding, TaxonomyRef,
};
pub use types::record::{is_falsy, SourceRecord};
pub use types::schema::FieldType;
