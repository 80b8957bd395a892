//! X/Twitter API v2 publisher

use async_trait::async_trait;
use post_scheduler_domain::{Platform, PlatformPublisher, PostContent, PublishError, PublishReceipt};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct TwitterPublisher {
    client: Client,
    user_token: SecretString,
    base_url: String,
    max_chars: usize,
    enabled: bool,
}

impl TwitterPublisher {
    pub fn with_base_url(
        user_token: SecretString,
        base_url: String,
        max_chars: usize,
        enabled: bool,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            user_token,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_chars,
            enabled,
        }
    }
}

#[derive(Serialize)]
struct CreateTweetRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct CreateTweetResponse {
    data: TweetData,
}

#[derive(Deserialize)]
struct TweetData {
    id: String,
}

#[async_trait]
impl PlatformPublisher for TwitterPublisher {
    async fn publish(&self, content: &PostContent) -> Result<PublishReceipt, PublishError> {
        if !self.enabled {
            return Err(PublishError::Disabled(Platform::Twitter));
        }

        let len = content.text.chars().count();
        if len > self.max_chars {
            return Err(PublishError::ContentTooLong {
                len,
                max: self.max_chars,
            });
        }

        let url = format!("{}/2/tweets", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.user_token.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&CreateTweetRequest {
                text: &content.text,
            })
            .send()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        if response.status() == 401 {
            return Err(PublishError::Auth("Invalid user token".to_string()));
        }

        if response.status() == 429 {
            return Err(PublishError::RateLimited);
        }

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Api(format!(
                "Failed to create tweet: {}",
                body
            )));
        }

        let tweet: CreateTweetResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        tracing::debug!(post_id = %content.post_id, tweet_id = %tweet.data.id, "Tweet created");

        Ok(PublishReceipt {
            platform: Platform::Twitter,
            url: Some(format!("https://x.com/i/status/{}", tweet.data.id)),
            id: tweet.data.id,
        })
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn platform(&self) -> Platform {
        Platform::Twitter
    }
}
