//! Error types for the destination repository.
//!
//! This module provides a unified error type for all destination operations.

mod destination_error;

pub use destination_error::DestinationError;
