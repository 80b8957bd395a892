//! Background trigger - periodically checks for due posts and notifies subscribers

use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::{
    model::ScheduledPost,
    ports::{Clock, PostStore, StoreError},
    usecases::queue::select_due,
};

/// Subscriber channel capacity; slow subscribers lose the oldest notifications
const CHANNEL_CAPACITY: usize = 16;

/// Fired when a check finds posts ready to publish
#[derive(Debug, Clone)]
pub struct DuePostsReady {
    pub posts: Vec<ScheduledPost>,
    pub detected_at: OffsetDateTime,
}

struct Running {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Owned periodic checker with an explicit `start`/`stop` lifecycle
///
/// Dropping the scheduler aborts its task.
pub struct BackgroundScheduler<St, Cl>
where
    St: PostStore + ?Sized + 'static,
    Cl: Clock + ?Sized + 'static,
{
    store: Arc<St>,
    clock: Arc<Cl>,
    interval: Duration,
    events: broadcast::Sender<DuePostsReady>,
    running: Option<Running>,
}

impl<St, Cl> BackgroundScheduler<St, Cl>
where
    St: PostStore + ?Sized + 'static,
    Cl: Clock + ?Sized + 'static,
{
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

    pub fn new(store: Arc<St>, clock: Arc<Cl>, interval: Duration) -> Self {
        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            store,
            clock,
            interval,
            events,
            running: None,
        }
    }

    /// Register a listener; dropping the receiver unregisters it
    pub fn subscribe(&self) -> broadcast::Receiver<DuePostsReady> {
        self.events.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// Spawn the polling task; the first check happens one interval from now
    pub fn start(&mut self) {
        if self.is_running() {
            tracing::debug!("Background scheduler already running");
            return;
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let store = Arc::clone(&self.store);
        let clock = Arc::clone(&self.clock);
        let events = self.events.clone();
        let period = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = check(store.as_ref(), clock.as_ref(), &events).await {
                            tracing::error!(error = %e, "Due-post check failed");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        break;
                    }
                }
            }

            tracing::debug!("Background scheduler stopped");
        });

        tracing::info!(interval_secs = period.as_secs(), "Background scheduler started");
        self.running = Some(Running { shutdown, handle });
    }

    /// Signal the task to finish and wait for it
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        let _ = running.shutdown.send(true);
        if let Err(e) = running.handle.await {
            if !e.is_cancelled() {
                tracing::warn!(error = %e, "Background scheduler task ended abnormally");
            }
        }
        tracing::info!("Background scheduler shut down");
    }

    /// Run one check immediately, returning how many posts are due
    pub async fn check_now(&self) -> Result<usize, StoreError> {
        check(self.store.as_ref(), self.clock.as_ref(), &self.events).await
    }
}

impl<St, Cl> Drop for BackgroundScheduler<St, Cl>
where
    St: PostStore + ?Sized + 'static,
    Cl: Clock + ?Sized + 'static,
{
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.handle.abort();
        }
    }
}

async fn check<St, Cl>(
    store: &St,
    clock: &Cl,
    events: &broadcast::Sender<DuePostsReady>,
) -> Result<usize, StoreError>
where
    St: PostStore + ?Sized,
    Cl: Clock + ?Sized,
{
    let now = clock.now();
    let posts = select_due(store.list().await?, now);
    let count = posts.len();

    if count > 0 {
        tracing::debug!(count = count, "Due posts detected");
        let event = DuePostsReady {
            posts,
            detected_at: now,
        };
        if events.send(event).is_err() {
            tracing::debug!("No subscribers for due-post notification");
        }
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::testing::{FakeClock, FakeStore, post};
    use time::macros::datetime;
    use tokio::sync::broadcast::error::TryRecvError;

    fn scheduler(store: FakeStore) -> BackgroundScheduler<FakeStore, FakeClock> {
        BackgroundScheduler::new(
            Arc::new(store),
            Arc::new(FakeClock::at(datetime!(2026-10-18 12:00 UTC))),
            Duration::from_secs(60),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_notifies_subscribers_each_tick() {
        let now = datetime!(2026-10-18 12:00 UTC);
        let mut scheduler = scheduler(FakeStore::with_posts(vec![
            post("due", now),
            post("later", now + time::Duration::hours(1)),
        ]));
        let mut first = scheduler.subscribe();
        let mut second = scheduler.subscribe();
        assert_eq!(scheduler.subscriber_count(), 2);

        scheduler.start();
        assert!(scheduler.is_running());

        let event = first.recv().await.unwrap();
        assert_eq!(event.posts.len(), 1);
        assert_eq!(event.posts[0].id, "due");
        assert_eq!(event.detected_at, now);
        assert_eq!(second.recv().await.unwrap().posts.len(), 1);

        scheduler.stop().await;
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_check_waits_one_interval() {
        let now = datetime!(2026-10-18 12:00 UTC);
        let mut scheduler = scheduler(FakeStore::with_posts(vec![post("due", now)]));
        let mut rx = scheduler.subscribe();
        scheduler.start();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(rx.try_recv().is_ok());

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_notifications() {
        let now = datetime!(2026-10-18 12:00 UTC);
        let mut scheduler = scheduler(FakeStore::with_posts(vec![post("due", now)]));
        let mut rx = scheduler.subscribe();

        scheduler.start();
        scheduler.stop().await;
        tokio::time::sleep(Duration::from_secs(300)).await;

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        // Stopping twice is harmless
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn test_no_event_without_due_posts() {
        let now = datetime!(2026-10-18 12:00 UTC);
        let scheduler = scheduler(FakeStore::with_posts(vec![post(
            "later",
            now + time::Duration::minutes(1),
        )]));
        let mut rx = scheduler.subscribe();

        assert_eq!(scheduler.check_now().await.unwrap(), 0);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_unsubscribe_by_dropping_receiver() {
        let scheduler = scheduler(FakeStore::new());
        let rx = scheduler.subscribe();
        assert_eq!(scheduler.subscriber_count(), 1);
        drop(rx);
        assert_eq!(scheduler.subscriber_count(), 0);
    }
}
