//! Scheduling use case - user-facing operations on the post queue

use std::sync::Arc;
use time::{Date, Duration};

use crate::{
    model::{
        NewPost, PostEdit, PostMetrics, PostPatch, PostStatus, ScheduledPost, SchedulingStats,
    },
    policy,
    ports::{Clock, PostStore, StoreError, ValidationError},
    stats::compute_stats,
    timezone::{TimezoneError, utc_to_local},
    usecases::queue::select_due,
};

/// Configuration for the scheduling service
#[derive(Debug, Clone)]
pub struct SchedulingConfig {
    /// Retry budget given to new posts unless the request overrides it
    pub max_retries: u32,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            max_retries: ScheduledPost::DEFAULT_MAX_RETRIES,
        }
    }
}

/// Errors from scheduling operations
#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("Store error: {0}")]
    Store(StoreError),
    #[error(transparent)]
    Timezone(#[from] TimezoneError),
}

impl From<StoreError> for SchedulingError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Validation(e) => SchedulingError::Validation(e),
            other => SchedulingError::Store(other),
        }
    }
}

/// Scheduling service over a post store
pub struct SchedulingService<St, Cl>
where
    St: PostStore + ?Sized,
    Cl: Clock + ?Sized,
{
    store: Arc<St>,
    clock: Arc<Cl>,
    config: SchedulingConfig,
}

impl<St, Cl> SchedulingService<St, Cl>
where
    St: PostStore + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(store: Arc<St>, clock: Arc<Cl>, config: SchedulingConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Validate a request and add it to the queue as a new scheduled post
    pub async fn schedule(&self, mut request: NewPost) -> Result<ScheduledPost, SchedulingError> {
        policy::validate_new_post(&mut request)?;

        let post = ScheduledPost {
            id: ScheduledPost::new_id(),
            content: request.content,
            caption: request.caption,
            media_url: request.media_url,
            platforms: request.platforms,
            scheduled_time: request.scheduled_time,
            timezone: request.timezone,
            status: PostStatus::Scheduled,
            recurrence: request.recurrence,
            max_recurrences: request.max_recurrences,
            recurrence_count: 0,
            retries: 0,
            max_retries: request.max_retries.unwrap_or(self.config.max_retries),
            last_error: None,
            created_at: self.clock.now(),
            published_at: None,
            tags: request.tags,
            metrics: None,
        };

        self.store.create(&post).await?;

        tracing::info!(
            post_id = %post.id,
            scheduled_time = %post.scheduled_time,
            timezone = %post.timezone,
            recurrence = %post.recurrence,
            "Scheduled post"
        );

        Ok(post)
    }

    pub async fn list(&self) -> Result<Vec<ScheduledPost>, SchedulingError> {
        Ok(self.store.list().await?)
    }

    pub async fn get(&self, id: &str) -> Result<ScheduledPost, SchedulingError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| SchedulingError::Store(StoreError::NotFound(id.to_string())))
    }

    /// Scheduled posts due within the next `days` days, soonest first
    pub async fn upcoming(&self, days: u32) -> Result<Vec<ScheduledPost>, SchedulingError> {
        let now = self.clock.now();
        let horizon = now
            .checked_add(Duration::days(i64::from(days)))
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "days",
                message: format!("{} days from now is out of range", days),
            })?;

        let mut posts: Vec<_> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|p| {
                p.status == PostStatus::Scheduled
                    && p.scheduled_time >= now
                    && p.scheduled_time <= horizon
            })
            .collect();
        posts.sort_by_key(|p| p.scheduled_time);
        Ok(posts)
    }

    /// Posts the queue processor would pick up right now
    pub async fn due(&self) -> Result<Vec<ScheduledPost>, SchedulingError> {
        Ok(select_due(self.store.list().await?, self.clock.now()))
    }

    /// Scheduled posts falling on `date` as seen from `timezone`
    pub async fn posts_on(
        &self,
        date: Date,
        timezone: &str,
    ) -> Result<Vec<ScheduledPost>, SchedulingError> {
        let mut matching = Vec::new();
        for post in self.store.list().await? {
            if post.status != PostStatus::Scheduled {
                continue;
            }
            if utc_to_local(post.scheduled_time, timezone)?.date() == date {
                matching.push(post);
            }
        }
        matching.sort_by_key(|p| p.scheduled_time);
        Ok(matching)
    }

    /// Change user-editable fields of a post that has not gone out yet
    pub async fn edit(
        &self,
        id: &str,
        mut edit: PostEdit,
    ) -> Result<ScheduledPost, SchedulingError> {
        let current = self.get(id).await?;
        ensure_status(&current, PostStatus::Scheduled)?;
        policy::validate_edit(&mut edit)?;

        let patch = PostPatch::from(edit);
        let mut merged = current;
        patch.clone().apply_to(&mut merged);
        policy::validate_edited(&merged)?;

        let updated = self.update_scheduled(id, patch).await?;
        tracing::info!(post_id = %id, "Edited post");
        Ok(updated)
    }

    /// Stop a scheduled post from ever being published
    pub async fn cancel(&self, id: &str) -> Result<ScheduledPost, SchedulingError> {
        let current = self.get(id).await?;
        ensure_status(&current, PostStatus::Scheduled)?;

        let patch = PostPatch {
            status: Some(PostStatus::Cancelled),
            ..Default::default()
        };
        let updated = self.update_scheduled(id, patch).await?;
        tracing::info!(post_id = %id, "Cancelled post");
        Ok(updated)
    }

    /// Apply `patch` only if the post has not left `scheduled` since it was read
    async fn update_scheduled(
        &self,
        id: &str,
        patch: PostPatch,
    ) -> Result<ScheduledPost, SchedulingError> {
        match self
            .store
            .update_if_status(id, PostStatus::Scheduled, patch)
            .await?
        {
            Some(updated) => Ok(updated),
            None => {
                let current = self.get(id).await?;
                Err(ValidationError::NotScheduled {
                    id: current.id,
                    status: current.status.to_string(),
                }
                .into())
            }
        }
    }

    pub async fn delete(&self, id: &str) -> Result<(), SchedulingError> {
        self.store.delete(id).await?;
        tracing::info!(post_id = %id, "Deleted post");
        Ok(())
    }

    /// Attach engagement data to a published post
    pub async fn record_metrics(
        &self,
        id: &str,
        metrics: PostMetrics,
    ) -> Result<ScheduledPost, SchedulingError> {
        let current = self.get(id).await?;
        ensure_status(&current, PostStatus::Published)?;

        if !metrics.engagement.is_finite() || metrics.engagement < 0.0 {
            return Err(ValidationError::InvalidValue {
                field: "engagement",
                message: "must be a non-negative number".to_string(),
            }
            .into());
        }

        let patch = PostPatch {
            metrics: Some(metrics),
            ..Default::default()
        };
        Ok(self.store.update(id, patch).await?)
    }

    pub async fn stats(&self) -> Result<SchedulingStats, SchedulingError> {
        Ok(compute_stats(&self.store.list().await?))
    }
}

fn ensure_status(post: &ScheduledPost, expected: PostStatus) -> Result<(), ValidationError> {
    if post.status == expected {
        return Ok(());
    }
    let id = post.id.clone();
    let status = post.status.to_string();
    Err(match expected {
        PostStatus::Published => ValidationError::NotPublished { id, status },
        _ => ValidationError::NotScheduled { id, status },
    })
}
