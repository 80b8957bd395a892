//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::model::{Platform, PostContent, PostPatch, PostStatus, PublishReceipt, ScheduledPost};

/// Malformed scheduling request or illegal user action
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Duplicate post id: {0}")]
    DuplicateId(String),
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
    #[error("Post {id} is {status}, expected scheduled")]
    NotScheduled { id: String, status: String },
    #[error("Post {id} is {status}, expected published")]
    NotPublished { id: String, status: String },
}

/// Error type for publisher operations
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Content too long: {len} > {max}")]
    ContentTooLong { len: usize, max: usize },
    #[error("Publisher for {0} is disabled")]
    Disabled(Platform),
    #[error("{0} requires a media url")]
    MissingMedia(Platform),
    #[error("{platform}: {source}")]
    Platform {
        platform: Platform,
        #[source]
        source: Box<PublishError>,
    },
}

/// Port for publishing rendered content to a single platform
#[async_trait]
pub trait PlatformPublisher: Send + Sync {
    /// Publish rendered content, returns the platform receipt
    async fn publish(&self, content: &PostContent) -> Result<PublishReceipt, PublishError>;

    /// Check if this publisher is enabled
    fn is_enabled(&self) -> bool;

    /// The platform this publisher posts to
    fn platform(&self) -> Platform;
}

/// The publish operation invoked by the queue processor for each due post
#[async_trait]
pub trait PostPublisher: Send + Sync {
    async fn publish(&self, post: &ScheduledPost) -> Result<(), PublishError>;
}

/// Error type for store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Port for a durable keyed string store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Port for the canonical collection of scheduled posts
///
/// Every read returns owned copies; changes go through `update`/`delete`.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Append a fully-formed post
    async fn create(&self, post: &ScheduledPost) -> Result<(), StoreError>;

    /// All posts, in store order
    async fn list(&self) -> Result<Vec<ScheduledPost>, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<ScheduledPost>, StoreError>;

    /// Merge `patch` into the post with `id`; `NotFound` when absent
    async fn update(&self, id: &str, patch: PostPatch) -> Result<ScheduledPost, StoreError>;

    /// Merge `patch` only if the post is still in `expected` status, checked under the same
    /// write as the merge; `Ok(None)` when it has moved on, `NotFound` when absent
    async fn update_if_status(
        &self,
        id: &str,
        expected: PostStatus,
        patch: PostPatch,
    ) -> Result<Option<ScheduledPost>, StoreError>;

    /// Remove the post; absent ids are ignored
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
