//! Storyblok implementation of the destination provider.
//!
//! This module provides a concrete implementation of `DestinationProvider`
//! using the Storyblok management API.

mod provider;

pub use provider::StoryblokProvider;
