//! Interface definitions for the destination provider.
//!
//! This module defines the abstract `DestinationProvider` trait that allows
//! for dependency injection and swappable destination implementations.

mod destination_provider;

pub use destination_provider::DestinationProvider;
