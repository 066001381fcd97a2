//! Destination error types.
//!
//! This module defines the unified error type for all destination operations,
//! from transport failures to rejected payloads.

use thiserror::Error;

/// Unified errors from destination operations.
///
/// Used by the `DestinationProvider` trait and `DestinationService`. Rate
/// limiting and timeouts are kept apart from other failures because asset
/// slot allocation retries on them.
#[derive(Debug, Clone, Error)]
pub enum DestinationError {
    /// The request could not be sent or its body could not be read.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The destination answered with an unexpected status.
    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// The destination answered 429.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The request timed out.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Failed to parse a response.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Requested object does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid configuration or request.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Local file handling failed.
    #[error("IO error: {0}")]
    Io(String),
}

impl DestinationError {
    /// Create an HTTP error.
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a status error.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Create a rate limit error.
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a timeout error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an IO error.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Timeout(_))
    }
}

impl From<reqwest::Error> for DestinationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::timeout(e.to_string())
        } else if e.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
            Self::rate_limited(e.to_string())
        } else if e.is_decode() {
            Self::decode(e.to_string())
        } else {
            Self::http(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(DestinationError::rate_limited("429").is_transient());
        assert!(DestinationError::timeout("slow").is_transient());
        assert!(!DestinationError::status(500, "boom").is_transient());
        assert!(!DestinationError::validation("bad").is_transient());
    }

    #[test]
    fn test_status_display() {
        let err = DestinationError::status(422, "slug taken");
        assert_eq!(err.to_string(), "Request failed with status 422: slug taken");
    }
}
