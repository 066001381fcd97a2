//! # Content Migrator
//!
//! Migrates a WordPress site into a Storyblok space: records are mapped onto
//! destination components, embedded media is re-uploaded, the folder tree is
//! rebuilt from the source paths and cross references are resolved to
//! destination identifiers.
//!
//! ## Architecture
//!
//! 1. **Processor**: maps source records and block trees onto components
//! 2. **Assets**: harvests, uploads and rewrites media URLs
//! 3. **Loader**: creates folders, then stories with resolved relationships
//! 4. **Orchestrator**: sequences one run and reports its counters
//!
//! ## Modules
//!
//! - [`config`]: Settings, migration configuration and dependency wiring
//! - [`processor`]: Field mapper, block expansion and markup conversion
//! - [`assets`]: Asset harvest, upload pool and URL rewrite
//! - [`loader`]: Folder planning and story creation
//! - [`inputs`]: Table exports, author map and migration plan
//! - [`orchestrator`]: Coordinates the migration
//! - [`errors`]: Error types for the migrator

pub mod assets;
pub mod config;
pub mod errors;
pub mod inputs;
pub mod loader;
pub mod orchestrator;
pub mod processor;

pub use config::Dependencies;
pub use errors::MigrationError;
pub use orchestrator::{MigrationReport, Orchestrator};
