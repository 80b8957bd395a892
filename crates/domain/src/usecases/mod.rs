//! Application use cases / business logic

pub mod dispatch;
pub mod queue;
pub mod scheduling;
pub mod trigger;

pub use dispatch::{PlatformRouter, render_for};
pub use queue::{QueueConfig, QueueError, QueueProcessor, select_due};
pub use scheduling::{SchedulingConfig, SchedulingError, SchedulingService};
pub use trigger::{BackgroundScheduler, DuePostsReady};

#[cfg(test)]
pub(crate) mod testing {
    //! Fakes shared by the use case tests

    use async_trait::async_trait;
    use std::sync::Mutex;
    use time::{Duration, OffsetDateTime};

    use crate::model::{Platform, PostPatch, PostStatus, Recurrence, ScheduledPost};
    use crate::ports::{Clock, PostStore, StoreError, ValidationError};

    pub struct FakeStore {
        posts: Mutex<Vec<ScheduledPost>>,
    }

    impl FakeStore {
        pub fn new() -> Self {
            Self {
                posts: Mutex::new(vec![]),
            }
        }

        pub fn with_posts(posts: Vec<ScheduledPost>) -> Self {
            Self {
                posts: Mutex::new(posts),
            }
        }

        pub fn snapshot(&self) -> Vec<ScheduledPost> {
            self.posts.lock().unwrap().clone()
        }

        pub fn find(&self, id: &str) -> ScheduledPost {
            self.snapshot()
                .into_iter()
                .find(|p| p.id == id)
                .expect("post exists")
        }
    }

    #[async_trait]
    impl PostStore for FakeStore {
        async fn create(&self, post: &ScheduledPost) -> Result<(), StoreError> {
            let mut posts = self.posts.lock().unwrap();
            if posts.iter().any(|p| p.id == post.id) {
                return Err(ValidationError::DuplicateId(post.id.clone()).into());
            }
            posts.push(post.clone());
            Ok(())
        }

        async fn list(&self) -> Result<Vec<ScheduledPost>, StoreError> {
            Ok(self.snapshot())
        }

        async fn get(&self, id: &str) -> Result<Option<ScheduledPost>, StoreError> {
            Ok(self.snapshot().into_iter().find(|p| p.id == id))
        }

        async fn update(&self, id: &str, patch: PostPatch) -> Result<ScheduledPost, StoreError> {
            let mut posts = self.posts.lock().unwrap();
            let post = posts
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            patch.apply_to(post);
            Ok(post.clone())
        }

        async fn update_if_status(
            &self,
            id: &str,
            expected: PostStatus,
            patch: PostPatch,
        ) -> Result<Option<ScheduledPost>, StoreError> {
            let mut posts = self.posts.lock().unwrap();
            let post = posts
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            if post.status != expected {
                return Ok(None);
            }
            patch.apply_to(post);
            Ok(Some(post.clone()))
        }

        async fn delete(&self, id: &str) -> Result<(), StoreError> {
            self.posts.lock().unwrap().retain(|p| p.id != id);
            Ok(())
        }
    }

    pub struct FakeClock {
        time: Mutex<OffsetDateTime>,
    }

    impl FakeClock {
        pub fn at(time: OffsetDateTime) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        pub fn advance(&self, by: Duration) {
            *self.time.lock().unwrap() += by;
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> OffsetDateTime {
            *self.time.lock().unwrap()
        }
    }

    pub fn post(id: &str, scheduled_time: OffsetDateTime) -> ScheduledPost {
        ScheduledPost {
            id: id.to_string(),
            content: "Generated clip".to_string(),
            caption: format!("Caption for {}", id),
            media_url: None,
            platforms: vec![Platform::Twitter],
            scheduled_time,
            timezone: "UTC".to_string(),
            status: PostStatus::Scheduled,
            recurrence: Recurrence::Once,
            max_recurrences: None,
            recurrence_count: 0,
            retries: 0,
            max_retries: ScheduledPost::DEFAULT_MAX_RETRIES,
            last_error: None,
            created_at: scheduled_time - Duration::days(1),
            published_at: None,
            tags: vec![],
            metrics: None,
        }
    }
}
