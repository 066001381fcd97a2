//! Configuration types for the Storyblok provider.

use std::time::Duration;

pub const DEFAULT_MANAGEMENT_URL: &str = "https://mapi.storyblok.com/v1";
pub const DEFAULT_CDN_URL: &str = "https://api.storyblok.com/v2";
pub const DEFAULT_LINKS_PER_PAGE: u32 = 1000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings of a Storyblok space.
///
/// The management API is authenticated with the OAuth token; the CDN API is
/// only used to list links, with the space's own read token.
#[derive(Debug, Clone)]
pub struct StoryblokConfig {
    pub management_url: String,
    pub cdn_url: String,
    pub oauth_token: String,
    pub space_id: String,
    /// Page size of the link index listing.
    pub links_per_page: u32,
    /// Per-request timeout. Elapsed requests surface as `DestinationError::Timeout`.
    pub timeout: Duration,
}

impl StoryblokConfig {
    /// Create a config against the public Storyblok endpoints.
    pub fn new(oauth_token: impl Into<String>, space_id: impl Into<String>) -> Self {
        Self {
            management_url: DEFAULT_MANAGEMENT_URL.to_string(),
            cdn_url: DEFAULT_CDN_URL.to_string(),
            oauth_token: oauth_token.into(),
            space_id: space_id.into(),
            links_per_page: DEFAULT_LINKS_PER_PAGE,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_management_url(mut self, url: impl Into<String>) -> Self {
        self.management_url = url.into();
        self
    }

    pub fn with_cdn_url(mut self, url: impl Into<String>) -> Self {
        self.cdn_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base URL of every management call of this space.
    pub fn space_url(&self) -> String {
        format!(
            "{}/spaces/{}",
            self.management_url.trim_end_matches('/'),
            self.space_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_url() {
        let config = StoryblokConfig::new("token", "123").with_management_url("http://mapi/v1/");
        assert_eq!(config.space_url(), "http://mapi/v1/spaces/123");
    }
}
