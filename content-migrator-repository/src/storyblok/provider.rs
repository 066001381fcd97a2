//! Storyblok provider implementation.
//!
//! This module provides the concrete implementation of `DestinationProvider`
//! on top of the Storyblok management and CDN APIs.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info};
use url::Url;

use crate::config::StoryblokConfig;
use crate::errors::DestinationError;
use crate::interfaces::DestinationProvider;
use crate::types::{ComponentSchema, CreatedStory, FolderRequest, Link, SignedUpload};

/// Header of the CDN links listing carrying the total number of links.
const TOTAL_HEADER: &str = "total";

#[derive(Deserialize)]
struct ComponentsResponse {
    #[serde(default)]
    components: Vec<ComponentSchema>,
}

#[derive(Deserialize)]
struct SpaceResponse {
    space: SpaceInfo,
}

#[derive(Deserialize)]
struct SpaceInfo {
    first_token: String,
}

#[derive(Deserialize)]
struct LinksResponse {
    #[serde(default)]
    links: HashMap<String, Link>,
}

#[derive(Deserialize)]
struct StoryResponse {
    story: CreatedStory,
}

#[derive(Deserialize)]
struct StoriesResponse {
    #[serde(default)]
    stories: Vec<StoryRef>,
}

#[derive(Deserialize)]
struct StoryRef {
    uuid: String,
}

/// Storyblok provider implementation.
///
/// # Example
///
/// ```ignore
/// use content_migrator_repository::{StoryblokConfig, StoryblokProvider};
///
/// let config = StoryblokConfig::new("oauth-token", "12345");
/// let provider = StoryblokProvider::new(config)?;
/// let components = provider.fetch_components().await?;
/// ```
pub struct StoryblokProvider {
    client: Client,
    config: StoryblokConfig,
}

impl StoryblokProvider {
    /// Create a new provider for the configured space.
    ///
    /// # Returns
    ///
    /// * `Ok(StoryblokProvider)` - A new provider instance
    /// * `Err(DestinationError)` - If a base URL is invalid or the HTTP client cannot be built
    pub fn new(config: StoryblokConfig) -> Result<Self, DestinationError> {
        for url in [&config.management_url, &config.cdn_url] {
            Url::parse(url)
                .map_err(|e| DestinationError::validation(format!("{}: {}", url, e)))?;
        }
        if config.space_id.is_empty() {
            return Err(DestinationError::validation("space id is required"));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DestinationError::http(e.to_string()))?;

        info!(
            management_url = %config.management_url,
            space_id = %config.space_id,
            "Created Storyblok provider"
        );

        Ok(Self { client, config })
    }

    fn management(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(reqwest::header::AUTHORIZATION, &self.config.oauth_token)
    }

    fn space_path(&self, path: &str) -> String {
        format!("{}/{}", self.config.space_url(), path)
    }

    /// Send a request and turn non-success statuses into errors.
    async fn send(builder: RequestBuilder) -> Result<Response, DestinationError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::TOO_MANY_REQUESTS => Err(DestinationError::rate_limited(body)),
            StatusCode::NOT_FOUND => Err(DestinationError::not_found(body)),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                Err(DestinationError::timeout(body))
            }
            _ => {
                error!(status = %status, body = %body, "Destination request failed");
                Err(DestinationError::status(status.as_u16(), body))
            }
        }
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, DestinationError> {
        let response = Self::send(builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| DestinationError::decode(e.to_string()))
    }

    async fn read_token(&self) -> Result<String, DestinationError> {
        let request = self.management(self.client.get(self.config.space_url()));
        let response: SpaceResponse = Self::send_json(request).await?;
        Ok(response.space.first_token)
    }
}

#[async_trait]
impl DestinationProvider for StoryblokProvider {
    async fn fetch_components(&self) -> Result<Vec<ComponentSchema>, DestinationError> {
        let request = self.management(self.client.get(self.space_path("components/")));
        let response: ComponentsResponse = Self::send_json(request).await?;
        debug!(count = response.components.len(), "Fetched component schemas");
        Ok(response.components)
    }

    async fn fetch_links(&self) -> Result<Vec<Link>, DestinationError> {
        let token = self.read_token().await?;
        let url = format!("{}/cdn/links/", self.config.cdn_url.trim_end_matches('/'));
        let per_page = self.config.links_per_page.to_string();

        let mut links = Vec::new();
        let mut page: u32 = 1;
        loop {
            let request = self.client.get(&url).query(&[
                ("token", token.as_str()),
                ("version", "draft"),
                ("per_page", per_page.as_str()),
                ("page", page.to_string().as_str()),
            ]);
            let response = Self::send(request).await?;
            let total = response
                .headers()
                .get(TOTAL_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<usize>().ok());
            let body: LinksResponse = response
                .json()
                .await
                .map_err(|e| DestinationError::decode(e.to_string()))?;

            let received = body.links.len();
            links.extend(body.links.into_values());

            let done = match total {
                Some(total) => links.len() >= total,
                None => true,
            };
            if done || received == 0 {
                break;
            }
            page += 1;
        }

        debug!(count = links.len(), "Fetched link index");
        Ok(links)
    }

    async fn create_folder(
        &self,
        request: &FolderRequest,
    ) -> Result<CreatedStory, DestinationError> {
        let mut story = json!({
            "name": request.name,
            "slug": request.slug,
            "is_folder": true,
        });
        if let Some(parent_id) = request.parent_id {
            story["parent_id"] = json!(parent_id);
        }

        let builder = self
            .management(self.client.post(self.space_path("stories")))
            .json(&json!({ "story": story }));
        let response: StoryResponse = Self::send_json(builder).await?;
        Ok(response.story)
    }

    async fn create_story(&self, story: &Value) -> Result<CreatedStory, DestinationError> {
        let builder = self
            .management(self.client.post(self.space_path("stories")))
            .json(&json!({ "story": story }));
        let response: StoryResponse = Self::send_json(builder).await?;
        Ok(response.story)
    }

    async fn find_story_uuid(
        &self,
        slug: &str,
        component: &str,
    ) -> Result<Option<String>, DestinationError> {
        let by_slugs = format!("*/{}", slug);
        let builder = self
            .management(self.client.get(self.space_path("stories")))
            .query(&[("by_slugs", by_slugs.as_str()), ("content_type", component)]);
        let response: StoriesResponse = Self::send_json(builder).await?;
        Ok(response.stories.into_iter().next().map(|s| s.uuid))
    }

    async fn request_upload_slot(
        &self,
        filename: &str,
    ) -> Result<SignedUpload, DestinationError> {
        let builder = self
            .management(self.client.post(self.space_path("assets")))
            .json(&json!({ "filename": filename }));
        Self::send_json(builder).await
    }

    async fn submit_upload(
        &self,
        slot: &SignedUpload,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<(), DestinationError> {
        let mut form = Form::new();
        for (key, value) in &slot.fields {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            form = form.text(key.clone(), value);
        }
        form = form.part("file", Part::bytes(bytes).file_name(filename.to_string()));

        Self::send(self.client.post(&slot.post_url).multipart(form)).await?;
        Ok(())
    }

    async fn create_tag(&self, name: &str) -> Result<(), DestinationError> {
        let builder = self
            .management(self.client.post(self.space_path("tags")))
            .json(&json!({ "name": name }));
        Self::send(builder).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_url() {
        let config = StoryblokConfig::new("token", "1").with_management_url("not a url");
        assert!(matches!(
            StoryblokProvider::new(config),
            Err(DestinationError::Validation(_))
        ));
    }

    #[test]
    fn test_new_rejects_empty_space() {
        let config = StoryblokConfig::new("token", "");
        assert!(StoryblokProvider::new(config).is_err());
    }

    #[test]
    fn test_space_path() {
        let provider = StoryblokProvider::new(StoryblokConfig::new("token", "42")).unwrap();
        assert_eq!(
            provider.space_path("stories"),
            "https://mapi.storyblok.com/v1/spaces/42/stories"
        );
    }

    #[test]
    fn test_links_response_decodes() {
        let body = serde_json::json!({
            "links": {
                "abc": {"id": 1, "uuid": "abc", "slug": "blog", "is_folder": true, "parent_id": 0},
                "def": {"id": 2, "uuid": "def", "slug": "blog/hello", "is_folder": false}
            }
        });
        let response: LinksResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.links.len(), 2);
        assert!(response.links["abc"].is_folder);
    }
}
