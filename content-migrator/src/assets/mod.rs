//! Asset subsystem.
//!
//! Harvests media URLs from the migration queue, re-hosts them on the
//! destination and rewrites every reference to the new locations.

mod harvest;
mod uploader;

pub use harvest::{harvest, rewrite};
pub use uploader::{AssetUploader, UploaderConfig};
