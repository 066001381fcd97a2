//! This module defines the core data structures used across the migrator.

pub mod entry;
pub mod mapping;
pub mod record;
pub mod schema;
