//! Platform dispatch - renders a post per platform and routes it to that platform's publisher

use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    model::{Platform, PostContent, PublishReceipt, ScheduledPost},
    ports::{PlatformPublisher, PostPublisher, PublishError},
};

/// Render a scheduled post for one platform, fitted to its character limit.
///
/// The caption (or the content when there is no caption) comes first, followed by the tags
/// as hashtags. Hashtags are dropped before the caption is truncated.
pub fn render_for(post: &ScheduledPost, platform: Platform) -> PostContent {
    let max = platform.max_chars();
    let body = if post.caption.trim().is_empty() {
        post.content.trim()
    } else {
        post.caption.trim()
    };
    let hashtags = format_hashtags(&post.tags);

    let text = if hashtags.is_empty() {
        truncate_to_length(body, max)
    } else {
        let combined = format!("{}\n\n{}", body, hashtags);
        if combined.chars().count() <= max {
            combined
        } else {
            truncate_to_length(body, max)
        }
    };

    PostContent {
        platform,
        text,
        media_url: post.media_url.clone(),
        post_id: post.id.clone(),
    }
}

fn format_hashtags(tags: &[String]) -> String {
    tags.iter()
        .map(|t| t.trim().trim_start_matches('#'))
        .filter(|t| !t.is_empty())
        .map(|t| format!("#{}", t.replace(char::is_whitespace, "")))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Truncate on character boundaries, marking the cut with an ellipsis
fn truncate_to_length(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    if max_len <= 3 {
        return text.chars().take(max_len).collect();
    }
    let kept: String = text.chars().take(max_len - 3).collect();
    format!("{}...", kept.trim_end())
}

/// One publisher per platform, selected by an exhaustive match
#[derive(Clone)]
pub struct PlatformRouter {
    twitter: Arc<dyn PlatformPublisher>,
    instagram: Arc<dyn PlatformPublisher>,
    tiktok: Arc<dyn PlatformPublisher>,
    youtube: Arc<dyn PlatformPublisher>,
}

impl PlatformRouter {
    pub fn new(
        twitter: Arc<dyn PlatformPublisher>,
        instagram: Arc<dyn PlatformPublisher>,
        tiktok: Arc<dyn PlatformPublisher>,
        youtube: Arc<dyn PlatformPublisher>,
    ) -> Self {
        Self {
            twitter,
            instagram,
            tiktok,
            youtube,
        }
    }

    pub fn publisher_for(&self, platform: Platform) -> &dyn PlatformPublisher {
        match platform {
            Platform::Twitter => self.twitter.as_ref(),
            Platform::Instagram => self.instagram.as_ref(),
            Platform::Tiktok => self.tiktok.as_ref(),
            Platform::Youtube => self.youtube.as_ref(),
        }
    }

    /// Platforms that currently have an enabled publisher
    pub fn enabled_platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .into_iter()
            .filter(|p| self.publisher_for(*p).is_enabled())
            .collect()
    }

    /// Publish to every target platform in order, stopping at the first failure
    pub async fn publish_post(
        &self,
        post: &ScheduledPost,
    ) -> Result<Vec<PublishReceipt>, PublishError> {
        let mut receipts = Vec::with_capacity(post.platforms.len());

        for platform in &post.platforms {
            let publisher = self.publisher_for(*platform);
            if !publisher.is_enabled() {
                return Err(PublishError::Disabled(*platform));
            }

            let content = render_for(post, *platform);
            let receipt =
                publisher
                    .publish(&content)
                    .await
                    .map_err(|source| PublishError::Platform {
                        platform: *platform,
                        source: Box::new(source),
                    })?;

            tracing::debug!(
                post_id = %post.id,
                platform = %platform,
                platform_post_id = %receipt.id,
                url = ?receipt.url,
                "Delivered to platform"
            );
            receipts.push(receipt);
        }

        Ok(receipts)
    }
}

#[async_trait]
impl PostPublisher for PlatformRouter {
    async fn publish(&self, post: &ScheduledPost) -> Result<(), PublishError> {
        self.publish_post(post).await.map(|_| ())
    }
}
