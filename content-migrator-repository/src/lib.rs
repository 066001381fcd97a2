//! # Content Migrator Repository
//!
//! This crate provides traits and implementations for interacting with the
//! destination headless CMS. It includes definitions for errors, interfaces,
//! a concrete implementation for Storyblok, an in-memory mock and the
//! session-caching `DestinationService` used by the migrator.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod mock;
pub mod service;
pub mod storyblok;
pub mod types;

pub use config::StoryblokConfig;
pub use errors::DestinationError;
pub use interfaces::DestinationProvider;
pub use mock::MockDestination;
pub use service::DestinationService;
pub use storyblok::StoryblokProvider;
pub use types::{
    ComponentSchema, ComponentSchemas, CreatedStory, FolderRequest, Link, LinkIndex, SchemaField,
    SchemaLookup, SignedUpload,
};
