//! Configuration and dependency initialization.

pub mod dependencies;
pub mod migration;
pub mod settings;

pub use dependencies::Dependencies;
pub use migration::{AssetSettings, BlockMappingConfig, MigrationConfig};
pub use settings::MigrationSettings;
