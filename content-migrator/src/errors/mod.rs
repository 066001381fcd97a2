//! Error types for the content migrator.

use content_migrator_repository::DestinationError;
use content_migrator_source::SourceError;
use thiserror::Error;

/// Errors that abort a migration run.
///
/// Per-item failures (one record, one asset, one folder, one story) never
/// surface here; they are logged and skipped where they happen.
#[derive(Error, Debug)]
pub enum MigrationError {
    /// The source system is unreachable or misconfigured.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// The destination is unreachable or misconfigured.
    #[error("Destination error: {0}")]
    Destination(#[from] DestinationError),

    /// Invalid settings or migration configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An external input file could not be read or parsed.
    #[error("Input error: {0}")]
    Input(String),

    /// Local filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A mapping could not be applied.
    #[error("Mapping error: {0}")]
    Mapping(String),
}

impl MigrationError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an input error.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Create a mapping error.
    pub fn mapping(msg: impl Into<String>) -> Self {
        Self::Mapping(msg.into())
    }
}

impl From<serde_json::Error> for MigrationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<csv::Error> for MigrationError {
    fn from(err: csv::Error) -> Self {
        Self::Input(err.to_string())
    }
}

/// Failure of a single asset upload.
#[derive(Error, Debug)]
pub enum AssetError {
    /// The file could not be downloaded from the source.
    #[error("Download failed: {0}")]
    Download(#[from] SourceError),

    /// The destination refused to allocate an upload slot.
    #[error("Upload slot failed: {0}")]
    Slot(DestinationError),

    /// The bytes could not be transferred to the signed target.
    #[error("Transfer failed: {0}")]
    Transfer(DestinationError),

    /// The scratch file could not be written or read.
    #[error("Scratch file error: {0}")]
    Io(#[from] std::io::Error),
}

impl AssetError {
    /// Only slot allocation hitting a rate limit or timeout is retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Slot(e) if e.is_transient())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_slot_errors_retry() {
        assert!(AssetError::Slot(DestinationError::rate_limited("429")).is_retryable());
        assert!(AssetError::Slot(DestinationError::timeout("slow")).is_retryable());
        assert!(!AssetError::Slot(DestinationError::status(500, "boom")).is_retryable());
        assert!(!AssetError::Transfer(DestinationError::timeout("slow")).is_retryable());
        assert!(!AssetError::Download(SourceError::not_found("x")).is_retryable());
    }
}
