//! Instagram Graph API publisher
//!
//! Publishing is two calls: create a media container, then publish it.

use async_trait::async_trait;
use post_scheduler_domain::{Platform, PlatformPublisher, PostContent, PublishError, PublishReceipt};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct InstagramPublisher {
    client: Client,
    access_token: SecretString,
    user_id: String,
    base_url: String,
    enabled: bool,
}

impl InstagramPublisher {
    pub fn with_base_url(
        access_token: SecretString,
        user_id: String,
        base_url: String,
        enabled: bool,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            access_token,
            user_id,
            base_url: base_url.trim_end_matches('/').to_string(),
            enabled,
        }
    }

    async fn check(response: Response, action: &str) -> Result<Response, PublishError> {
        let status = response.status();
        if status == 401 || status == 403 {
            return Err(PublishError::Auth("Invalid access token".to_string()));
        }
        if status == 429 {
            return Err(PublishError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Api(format!("Failed to {}: {}", action, body)));
        }
        Ok(response)
    }
}

fn is_video(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    path.ends_with(".mp4") || path.ends_with(".mov")
}

#[derive(Serialize)]
struct CreateContainerRequest<'a> {
    caption: &'a str,
    media_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    video_url: Option<&'a str>,
    access_token: &'a str,
}

#[derive(Serialize)]
struct PublishContainerRequest<'a> {
    creation_id: &'a str,
    access_token: &'a str,
}

#[derive(Deserialize)]
struct IdResponse {
    id: String,
}

#[async_trait]
impl PlatformPublisher for InstagramPublisher {
    async fn publish(&self, content: &PostContent) -> Result<PublishReceipt, PublishError> {
        if !self.enabled {
            return Err(PublishError::Disabled(Platform::Instagram));
        }

        let media_url = content
            .media_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(PublishError::MissingMedia(Platform::Instagram))?;

        let max = Platform::Instagram.max_chars();
        let len = content.text.chars().count();
        if len > max {
            return Err(PublishError::ContentTooLong { len, max });
        }

        let token = self.access_token.expose_secret();
        let video = is_video(media_url);
        let container = CreateContainerRequest {
            caption: &content.text,
            media_type: if video { "VIDEO" } else { "IMAGE" },
            image_url: (!video).then_some(media_url),
            video_url: video.then_some(media_url),
            access_token: token,
        };

        let response = self
            .client
            .post(format!("{}/{}/media", self.base_url, self.user_id))
            .json(&container)
            .send()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;
        let created: IdResponse = Self::check(response, "create media container")
            .await?
            .json()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        tracing::debug!(
            post_id = %content.post_id,
            creation_id = %created.id,
            "Media container created"
        );

        let response = self
            .client
            .post(format!("{}/{}/media_publish", self.base_url, self.user_id))
            .json(&PublishContainerRequest {
                creation_id: &created.id,
                access_token: token,
            })
            .send()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;
        let published: IdResponse = Self::check(response, "publish media")
            .await?
            .json()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        Ok(PublishReceipt {
            platform: Platform::Instagram,
            id: published.id,
            url: None,
        })
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn platform(&self) -> Platform {
        Platform::Instagram
    }
}
