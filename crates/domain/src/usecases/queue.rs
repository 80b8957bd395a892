//! Queue processor - publishes due posts, applies retry and recurrence

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use time::{Duration, OffsetDateTime};

use crate::{
    model::{DrainOutcome, DrainSummary, PostPatch, PostStatus, ScheduledPost},
    ports::{Clock, PostPublisher, PostStore, StoreError},
    recurrence::next_occurrence,
};

/// Configuration for the queue processor
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Delay before a failed post is attempted again
    pub retry_delay: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::minutes(5),
        }
    }
}

/// Errors from a queue drain
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Posts the processor would pick up at `now`, in store order
pub fn select_due(posts: Vec<ScheduledPost>, now: OffsetDateTime) -> Vec<ScheduledPost> {
    posts.into_iter().filter(|p| p.is_due(now)).collect()
}

/// Drains due posts through a publish operation
///
/// At most one drain runs at a time per processor (and its clones); a drain requested while
/// another is in flight returns [`DrainOutcome::AlreadyRunning`].
pub struct QueueProcessor<St, Cl>
where
    St: PostStore + ?Sized,
    Cl: Clock + ?Sized,
{
    store: Arc<St>,
    clock: Arc<Cl>,
    config: QueueConfig,
    in_flight: Arc<AtomicBool>,
}

impl<St, Cl> Clone for QueueProcessor<St, Cl>
where
    St: PostStore + ?Sized,
    Cl: Clock + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            config: self.config.clone(),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<St, Cl> QueueProcessor<St, Cl>
where
    St: PostStore + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(store: Arc<St>, clock: Arc<Cl>, config: QueueConfig) -> Self {
        Self {
            store,
            clock,
            config,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a drain is currently running
    pub fn is_draining(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Publish every due post, sequentially, in store order.
    ///
    /// Publish failures are folded into each post's state; store failures abort the drain.
    pub async fn process_queue<P>(&self, publisher: &P) -> Result<DrainOutcome, QueueError>
    where
        P: PostPublisher + ?Sized,
    {
        let Some(_guard) = DrainGuard::acquire(&self.in_flight) else {
            tracing::debug!("Queue drain already in flight, skipping");
            return Ok(DrainOutcome::AlreadyRunning);
        };

        let now = self.clock.now();
        let due = select_due(self.store.list().await?, now);
        let mut summary = DrainSummary::default();

        if due.is_empty() {
            tracing::debug!("No due posts");
            return Ok(DrainOutcome::Completed(summary));
        }

        tracing::info!(count = due.len(), "Draining due posts");

        for selected in due {
            // Re-read: the post may have been cancelled or deleted since selection
            let post = match self.store.get(&selected.id).await? {
                Some(post) if post.status == PostStatus::Scheduled => post,
                current => {
                    tracing::debug!(
                        post_id = %selected.id,
                        status = ?current.map(|p| p.status),
                        "Skipping post no longer scheduled"
                    );
                    summary.skipped += 1;
                    continue;
                }
            };

            self.process_post(publisher, post, &mut summary).await?;
        }

        tracing::info!(
            published = summary.published,
            retried = summary.retried,
            failed = summary.failed,
            skipped = summary.skipped,
            spawned = summary.spawned,
            "Queue drain complete"
        );

        Ok(DrainOutcome::Completed(summary))
    }

    async fn process_post<P>(
        &self,
        publisher: &P,
        post: ScheduledPost,
        summary: &mut DrainSummary,
    ) -> Result<(), QueueError>
    where
        P: PostPublisher + ?Sized,
    {
        match publisher.publish(&post).await {
            Ok(()) => {
                let published_at = self.clock.now();
                let patch = PostPatch {
                    status: Some(PostStatus::Published),
                    published_at: Some(published_at),
                    ..Default::default()
                };
                if !self.commit(&post.id, patch, summary).await? {
                    return Ok(());
                }
                summary.published += 1;
                tracing::info!(post_id = %post.id, platforms = ?post.platforms, "Published");

                if let Some(next) = next_in_lineage(&post, published_at) {
                    self.store.create(&next).await?;
                    summary.spawned += 1;
                    tracing::info!(
                        post_id = %post.id,
                        next_id = %next.id,
                        scheduled_time = %next.scheduled_time,
                        recurrence_count = next.recurrence_count,
                        "Scheduled next occurrence"
                    );
                }
            }
            Err(error) => {
                let retries = post.retries + 1;
                let last_error = error.to_string();
                let retry_at = if retries < post.max_retries {
                    self.clock.now().checked_add(self.config.retry_delay)
                } else {
                    None
                };

                if let Some(retry_at) = retry_at {
                    let patch = PostPatch {
                        retries: Some(retries),
                        scheduled_time: Some(retry_at),
                        last_error: Some(last_error.clone()),
                        ..Default::default()
                    };
                    if self.commit(&post.id, patch, summary).await? {
                        summary.retried += 1;
                        tracing::warn!(
                            post_id = %post.id,
                            retries = retries,
                            max_retries = post.max_retries,
                            retry_at = %retry_at,
                            error = %last_error,
                            "Publish failed, will retry"
                        );
                    }
                } else {
                    let patch = PostPatch {
                        status: Some(PostStatus::Failed),
                        retries: Some(retries),
                        last_error: Some(last_error.clone()),
                        ..Default::default()
                    };
                    if self.commit(&post.id, patch, summary).await? {
                        summary.failed += 1;
                        tracing::error!(
                            post_id = %post.id,
                            retries = retries,
                            max_retries = post.max_retries,
                            error = %last_error,
                            "Publish failed, no retry possible"
                        );
                    }
                }
            }
        }

        Ok(())
    }

    /// Apply a patch while the post is still scheduled
    ///
    /// A post cancelled or deleted while its publish call was in flight is left as it is,
    /// counted as skipped, and reported as `false`.
    async fn commit(
        &self,
        id: &str,
        patch: PostPatch,
        summary: &mut DrainSummary,
    ) -> Result<bool, QueueError> {
        match self
            .store
            .update_if_status(id, PostStatus::Scheduled, patch)
            .await
        {
            Ok(Some(_)) => Ok(true),
            Ok(None) => {
                tracing::warn!(post_id = %id, "Post changed status while being processed");
                summary.skipped += 1;
                Ok(false)
            }
            Err(StoreError::NotFound(_)) => {
                tracing::warn!(post_id = %id, "Post removed while being processed");
                summary.skipped += 1;
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Build the next post of a recurring lineage, if the rule and cap allow one
fn next_in_lineage(post: &ScheduledPost, now: OffsetDateTime) -> Option<ScheduledPost> {
    if !post.can_recur() {
        return None;
    }
    let scheduled_time = next_occurrence(post.recurrence, post.scheduled_time)?;

    Some(ScheduledPost {
        id: ScheduledPost::new_id(),
        scheduled_time,
        status: PostStatus::Scheduled,
        recurrence_count: post.recurrence_count + 1,
        retries: 0,
        last_error: None,
        created_at: now,
        published_at: None,
        metrics: None,
        ..post.clone()
    })
}

struct DrainGuard<'a>(&'a AtomicBool);

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Recurrence;
    use crate::ports::PublishError;
    use crate::usecases::scheduling::{SchedulingConfig, SchedulingService};
    use crate::usecases::testing::{FakeClock, FakeStore, post};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use time::macros::datetime;
    use tokio::sync::Notify;

    struct OkPublisher {
        published: Mutex<Vec<String>>,
    }

    impl OkPublisher {
        fn new() -> Self {
            Self {
                published: Mutex::new(vec![]),
            }
        }

        fn ids(&self) -> Vec<String> {
            self.published.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PostPublisher for OkPublisher {
        async fn publish(&self, post: &ScheduledPost) -> Result<(), PublishError> {
            self.published.lock().unwrap().push(post.id.clone());
            Ok(())
        }
    }

    struct FailingPublisher;

    #[async_trait]
    impl PostPublisher for FailingPublisher {
        async fn publish(&self, _post: &ScheduledPost) -> Result<(), PublishError> {
            Err(PublishError::Api("platform unavailable".to_string()))
        }
    }

    fn processor(
        store: &Arc<FakeStore>,
        clock: &Arc<FakeClock>,
    ) -> QueueProcessor<FakeStore, FakeClock> {
        QueueProcessor::new(Arc::clone(store), Arc::clone(clock), QueueConfig::default())
    }

    fn completed(outcome: DrainOutcome) -> DrainSummary {
        match outcome {
            DrainOutcome::Completed(summary) => summary,
            DrainOutcome::AlreadyRunning => panic!("drain unexpectedly skipped"),
        }
    }

    #[tokio::test]
    async fn test_publishes_one_off_post() {
        let now = datetime!(2026-10-18 12:00 UTC);
        let store = Arc::new(FakeStore::with_posts(vec![post(
            "a",
            now - Duration::seconds(1),
        )]));
        let clock = Arc::new(FakeClock::at(now));

        let summary = completed(
            processor(&store, &clock)
                .process_queue(&OkPublisher::new())
                .await
                .unwrap(),
        );

        assert_eq!(summary.published, 1);
        assert_eq!(summary.spawned, 0);
        let stored = store.snapshot();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, PostStatus::Published);
        assert_eq!(stored[0].published_at, Some(now));
    }

    #[tokio::test]
    async fn test_selects_exactly_the_due_posts() {
        let now = datetime!(2026-10-18 12:00 UTC);
        let mut cancelled = post("cancelled", now - Duration::hours(1));
        cancelled.status = PostStatus::Cancelled;
        let mut failed = post("failed", now - Duration::hours(1));
        failed.status = PostStatus::Failed;
        let store = Arc::new(FakeStore::with_posts(vec![
            post("past", now - Duration::hours(2)),
            post("exact", now),
            post("future", now + Duration::seconds(1)),
            cancelled,
            failed,
        ]));
        let clock = Arc::new(FakeClock::at(now));
        let publisher = OkPublisher::new();

        processor(&store, &clock)
            .process_queue(&publisher)
            .await
            .unwrap();

        assert_eq!(publisher.ids(), vec!["past", "exact"]);
        assert_eq!(store.find("future").status, PostStatus::Scheduled);
        assert_eq!(store.find("cancelled").status, PostStatus::Cancelled);
        assert_eq!(store.find("failed").status, PostStatus::Failed);
    }

    #[tokio::test]
    async fn test_daily_lineage_stops_at_cap() {
        let start = datetime!(2026-10-18 09:00 UTC);
        let mut original = post("original", start);
        original.recurrence = Recurrence::Daily;
        original.max_recurrences = Some(2);
        let store = Arc::new(FakeStore::with_posts(vec![original]));
        let clock = Arc::new(FakeClock::at(start));
        let processor = processor(&store, &clock);
        let publisher = OkPublisher::new();

        let first = completed(processor.process_queue(&publisher).await.unwrap());
        assert_eq!(first.spawned, 1);

        let spawned: Vec<_> = store
            .snapshot()
            .into_iter()
            .filter(|p| p.status == PostStatus::Scheduled)
            .collect();
        assert_eq!(spawned.len(), 1);
        assert_eq!(spawned[0].recurrence_count, 1);
        assert_eq!(spawned[0].scheduled_time, start + Duration::hours(24));
        assert_ne!(spawned[0].id, "original");
        assert_eq!(spawned[0].retries, 0);

        clock.advance(Duration::hours(24));
        let second = completed(processor.process_queue(&publisher).await.unwrap());
        assert_eq!(second.spawned, 1);

        for _ in 0..3 {
            clock.advance(Duration::hours(24));
            processor.process_queue(&publisher).await.unwrap();
        }

        let all = store.snapshot();
        assert_eq!(all.len(), 3, "original plus two descendants");
        assert_eq!(publisher.ids().len(), 3);
        assert!(all.iter().all(|p| p.status == PostStatus::Published));
        assert_eq!(all.iter().map(|p| p.recurrence_count).max(), Some(2));
    }

    #[tokio::test]
    async fn test_retries_then_fails() {
        let now = datetime!(2026-10-18 12:00 UTC);
        let store = Arc::new(FakeStore::with_posts(vec![post("a", now)]));
        let clock = Arc::new(FakeClock::at(now));
        let processor = processor(&store, &clock);

        for attempt in 1..=3u32 {
            processor.process_queue(&FailingPublisher).await.unwrap();
            let stored = store.find("a");
            assert_eq!(stored.retries, attempt);
            if attempt < 3 {
                assert_eq!(stored.status, PostStatus::Scheduled);
                assert_eq!(stored.scheduled_time, clock.now() + Duration::minutes(5));
            }
            clock.advance(Duration::minutes(5));
        }

        let stored = store.find("a");
        assert_eq!(stored.status, PostStatus::Failed);
        assert_eq!(stored.retries, 3);
        assert_eq!(
            stored.last_error.as_deref(),
            Some("API error: platform unavailable")
        );

        // Terminal: further drains leave it alone
        let summary = completed(processor.process_queue(&FailingPublisher).await.unwrap());
        assert_eq!(summary.processed(), 0);
        assert_eq!(store.find("a").retries, 3);
    }

    #[tokio::test]
    async fn test_retry_is_not_due_before_delay() {
        let now = datetime!(2026-10-18 12:00 UTC);
        let store = Arc::new(FakeStore::with_posts(vec![post("a", now)]));
        let clock = Arc::new(FakeClock::at(now));
        let processor = processor(&store, &clock);

        processor.process_queue(&FailingPublisher).await.unwrap();
        clock.advance(Duration::minutes(4));
        let summary = completed(processor.process_queue(&FailingPublisher).await.unwrap());

        assert_eq!(summary.processed(), 0);
        assert_eq!(store.find("a").retries, 1);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_the_drain() {
        struct PickyPublisher;

        #[async_trait]
        impl PostPublisher for PickyPublisher {
            async fn publish(&self, post: &ScheduledPost) -> Result<(), PublishError> {
                if post.id == "bad" {
                    Err(PublishError::RateLimited)
                } else {
                    Ok(())
                }
            }
        }

        let now = datetime!(2026-10-18 12:00 UTC);
        let store = Arc::new(FakeStore::with_posts(vec![
            post("bad", now),
            post("good", now),
        ]));
        let clock = Arc::new(FakeClock::at(now));

        let summary = completed(
            processor(&store, &clock)
                .process_queue(&PickyPublisher)
                .await
                .unwrap(),
        );

        assert_eq!(summary.retried, 1);
        assert_eq!(summary.published, 1);
        assert_eq!(store.find("good").status, PostStatus::Published);
    }

    #[tokio::test]
    async fn test_cancelled_post_is_never_touched() {
        let now = datetime!(2026-10-18 12:00 UTC);
        let mut cancelled = post("a", now - Duration::minutes(1));
        cancelled.status = PostStatus::Cancelled;
        let before = cancelled.clone();
        let store = Arc::new(FakeStore::with_posts(vec![cancelled]));
        let clock = Arc::new(FakeClock::at(now));
        let processor = processor(&store, &clock);

        for _ in 0..3 {
            processor.process_queue(&FailingPublisher).await.unwrap();
            processor.process_queue(&OkPublisher::new()).await.unwrap();
            clock.advance(Duration::hours(1));
        }

        assert_eq!(store.find("a"), before);
    }

    #[tokio::test]
    async fn test_cancel_during_drain_skips_later_post() {
        struct CancellingPublisher {
            store: Arc<FakeStore>,
        }

        #[async_trait]
        impl PostPublisher for CancellingPublisher {
            async fn publish(&self, _post: &ScheduledPost) -> Result<(), PublishError> {
                let patch = PostPatch {
                    status: Some(PostStatus::Cancelled),
                    ..Default::default()
                };
                let _ = self.store.update("second", patch).await;
                Ok(())
            }
        }

        let now = datetime!(2026-10-18 12:00 UTC);
        let store = Arc::new(FakeStore::with_posts(vec![
            post("first", now),
            post("second", now),
        ]));
        let clock = Arc::new(FakeClock::at(now));
        let publisher = CancellingPublisher {
            store: Arc::clone(&store),
        };

        let summary = completed(
            processor(&store, &clock)
                .process_queue(&publisher)
                .await
                .unwrap(),
        );

        assert_eq!(summary.published, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(store.find("second").status, PostStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_while_publishing_keeps_post_cancelled() {
        struct SelfCancellingPublisher {
            service: SchedulingService<FakeStore, FakeClock>,
        }

        #[async_trait]
        impl PostPublisher for SelfCancellingPublisher {
            async fn publish(&self, post: &ScheduledPost) -> Result<(), PublishError> {
                self.service.cancel(&post.id).await.unwrap();
                Ok(())
            }
        }

        let now = datetime!(2026-10-18 12:00 UTC);
        let mut daily = post("a", now);
        daily.recurrence = Recurrence::Daily;
        let store = Arc::new(FakeStore::with_posts(vec![daily]));
        let clock = Arc::new(FakeClock::at(now));
        let publisher = SelfCancellingPublisher {
            service: SchedulingService::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                SchedulingConfig::default(),
            ),
        };

        let summary = completed(
            processor(&store, &clock)
                .process_queue(&publisher)
                .await
                .unwrap(),
        );

        assert_eq!(summary.published, 0);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.spawned, 0);
        let stored = store.snapshot();
        assert_eq!(stored.len(), 1, "no next occurrence for a cancelled lineage");
        assert_eq!(stored[0].status, PostStatus::Cancelled);
        assert_eq!(stored[0].published_at, None);
    }

    #[tokio::test]
    async fn test_cancel_during_failed_publish_is_not_retried() {
        struct CancelThenFail {
            store: Arc<FakeStore>,
        }

        #[async_trait]
        impl PostPublisher for CancelThenFail {
            async fn publish(&self, post: &ScheduledPost) -> Result<(), PublishError> {
                let patch = PostPatch {
                    status: Some(PostStatus::Cancelled),
                    ..Default::default()
                };
                self.store.update(&post.id, patch).await.unwrap();
                Err(PublishError::RateLimited)
            }
        }

        let now = datetime!(2026-10-18 12:00 UTC);
        let store = Arc::new(FakeStore::with_posts(vec![post("a", now)]));
        let clock = Arc::new(FakeClock::at(now));
        let publisher = CancelThenFail {
            store: Arc::clone(&store),
        };

        let summary = completed(
            processor(&store, &clock)
                .process_queue(&publisher)
                .await
                .unwrap(),
        );

        assert_eq!(summary.retried, 0);
        assert_eq!(summary.skipped, 1);
        let stored = store.find("a");
        assert_eq!(stored.status, PostStatus::Cancelled);
        assert_eq!(stored.retries, 0);
        assert_eq!(stored.last_error, None);
    }

    #[tokio::test]
    async fn test_unrepresentable_retry_time_fails_post() {
        let now = datetime!(2026-10-18 12:00 UTC);
        let store = Arc::new(FakeStore::with_posts(vec![post("a", now)]));
        let clock = Arc::new(FakeClock::at(now));
        let processor = QueueProcessor::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            QueueConfig {
                retry_delay: Duration::MAX,
            },
        );

        let summary = completed(processor.process_queue(&FailingPublisher).await.unwrap());

        assert_eq!(summary.failed, 1);
        let stored = store.find("a");
        assert_eq!(stored.status, PostStatus::Failed);
        assert_eq!(stored.retries, 1);
    }

    #[tokio::test]
    async fn test_overlapping_drain_is_skipped() {
        struct BlockingPublisher {
            started: Notify,
            release: Notify,
        }

        #[async_trait]
        impl PostPublisher for BlockingPublisher {
            async fn publish(&self, _post: &ScheduledPost) -> Result<(), PublishError> {
                self.started.notify_one();
                self.release.notified().await;
                Ok(())
            }
        }

        let now = datetime!(2026-10-18 12:00 UTC);
        let store = Arc::new(FakeStore::with_posts(vec![post("a", now)]));
        let clock = Arc::new(FakeClock::at(now));
        let processor = processor(&store, &clock);
        let blocking = BlockingPublisher {
            started: Notify::new(),
            release: Notify::new(),
        };
        let other = OkPublisher::new();

        let (first, second) = tokio::join!(processor.process_queue(&blocking), async {
            blocking.started.notified().await;
            assert!(processor.is_draining());
            let outcome = processor.process_queue(&other).await;
            blocking.release.notify_one();
            outcome
        });

        assert_eq!(completed(first.unwrap()).published, 1);
        assert_eq!(second.unwrap(), DrainOutcome::AlreadyRunning);
        assert!(other.ids().is_empty());
        assert!(!processor.is_draining());
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        struct BrokenStore;

        #[async_trait]
        impl PostStore for BrokenStore {
            async fn create(&self, _post: &ScheduledPost) -> Result<(), StoreError> {
                Err(StoreError::Backend("disk full".to_string()))
            }
            async fn list(&self) -> Result<Vec<ScheduledPost>, StoreError> {
                Err(StoreError::Backend("disk full".to_string()))
            }
            async fn get(&self, _id: &str) -> Result<Option<ScheduledPost>, StoreError> {
                Err(StoreError::Backend("disk full".to_string()))
            }
            async fn update(
                &self,
                _id: &str,
                _patch: PostPatch,
            ) -> Result<ScheduledPost, StoreError> {
                Err(StoreError::Backend("disk full".to_string()))
            }
            async fn update_if_status(
                &self,
                _id: &str,
                _expected: PostStatus,
                _patch: PostPatch,
            ) -> Result<Option<ScheduledPost>, StoreError> {
                Err(StoreError::Backend("disk full".to_string()))
            }
            async fn delete(&self, _id: &str) -> Result<(), StoreError> {
                Err(StoreError::Backend("disk full".to_string()))
            }
        }

        let processor = QueueProcessor::new(
            Arc::new(BrokenStore),
            Arc::new(FakeClock::at(datetime!(2026-10-18 12:00 UTC))),
            QueueConfig::default(),
        );

        let result = processor.process_queue(&OkPublisher::new()).await;
        assert!(matches!(result, Err(QueueError::Store(StoreError::Backend(_)))));
        assert!(!processor.is_draining());
    }
}
