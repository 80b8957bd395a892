//! Platform publishers

mod instagram;
mod twitter;

pub use instagram::InstagramPublisher;
pub use twitter::TwitterPublisher;

use async_trait::async_trait;
use post_scheduler_domain::{Platform, PlatformPublisher, PostContent, PublishError, PublishReceipt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// In-memory publisher for dry-run mode and tests
pub struct StubPublisher {
    platform: Platform,
    enabled: bool,
    failure: Mutex<Option<String>>,
    published: AtomicUsize,
}

impl StubPublisher {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            enabled: true,
            failure: Mutex::new(None),
            published: AtomicUsize::new(0),
        }
    }

    pub fn disabled(platform: Platform) -> Self {
        Self {
            enabled: false,
            ..Self::new(platform)
        }
    }

    /// Make subsequent publishes fail (`Some`) or succeed (`None`)
    pub fn set_failure(&self, message: Option<String>) {
        *lock(&self.failure) = message;
    }

    /// Number of successful publishes so far
    pub fn published_count(&self) -> usize {
        self.published.load(Ordering::Relaxed)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl PlatformPublisher for StubPublisher {
    async fn publish(&self, content: &PostContent) -> Result<PublishReceipt, PublishError> {
        if !self.enabled {
            return Err(PublishError::Disabled(self.platform));
        }
        if let Some(message) = lock(&self.failure).clone() {
            return Err(PublishError::Api(message));
        }

        let total = self.published.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(
            platform = %self.platform,
            post_id = %content.post_id,
            chars = content.text.chars().count(),
            total = total,
            "Dry run: would publish"
        );

        Ok(PublishReceipt {
            platform: self.platform,
            id: format!("stub_{}", content.post_id),
            url: None,
        })
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn platform(&self) -> Platform {
        self.platform
    }
}
