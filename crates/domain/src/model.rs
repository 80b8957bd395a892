//! Domain models and value objects

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

/// Social platform a post can be distributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Twitter,
    Instagram,
    Tiktok,
    Youtube,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Twitter,
        Platform::Instagram,
        Platform::Tiktok,
        Platform::Youtube,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Instagram => "instagram",
            Platform::Tiktok => "tiktok",
            Platform::Youtube => "youtube",
        }
    }

    /// Maximum text length accepted by the platform
    pub fn max_chars(&self) -> usize {
        match self {
            Platform::Twitter => 280,
            Platform::Instagram => 2200,
            Platform::Tiktok => 2200,
            Platform::Youtube => 5000,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "twitter" | "x" => Ok(Platform::Twitter),
            "instagram" => Ok(Platform::Instagram),
            "tiktok" => Ok(Platform::Tiktok),
            "youtube" => Ok(Platform::Youtube),
            other => Err(format!("unknown platform: {}", other)),
        }
    }
}

/// Lifecycle status of a scheduled post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    #[default]
    Scheduled,
    Published,
    Failed,
    Cancelled,
}

impl PostStatus {
    /// Terminal statuses are never re-entered automatically
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PostStatus::Scheduled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Scheduled => "scheduled",
            PostStatus::Published => "published",
            PostStatus::Failed => "failed",
            PostStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Ok(PostStatus::Scheduled),
            "published" => Ok(PostStatus::Published),
            "failed" => Ok(PostStatus::Failed),
            "cancelled" | "canceled" => Ok(PostStatus::Cancelled),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

/// How a post repeats after it is published
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recurrence {
    /// Publish once, never repeat
    #[default]
    Once,
    Daily,
    Weekly,
    /// Same day-of-month in the next calendar month
    Monthly,
    /// Every `interval_days` days; no repeat when unset
    Custom { interval_days: Option<u32> },
}

impl Recurrence {
    /// Build a rule from its name and an optional custom interval
    pub fn from_parts(kind: &str, interval_days: Option<u32>) -> Result<Self, String> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "once" | "none" => Ok(Recurrence::Once),
            "daily" => Ok(Recurrence::Daily),
            "weekly" => Ok(Recurrence::Weekly),
            "monthly" => Ok(Recurrence::Monthly),
            "custom" => Ok(Recurrence::Custom { interval_days }),
            other => Err(format!("unknown recurrence: {}", other)),
        }
    }

    pub fn is_once(&self) -> bool {
        matches!(self, Recurrence::Once)
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recurrence::Once => f.write_str("once"),
            Recurrence::Daily => f.write_str("daily"),
            Recurrence::Weekly => f.write_str("weekly"),
            Recurrence::Monthly => f.write_str("monthly"),
            Recurrence::Custom {
                interval_days: Some(days),
            } => write!(f, "every {} days", days),
            Recurrence::Custom {
                interval_days: None,
            } => f.write_str("custom"),
        }
    }
}

/// Engagement data recorded for a published post
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PostMetrics {
    /// Engagement rate (percent)
    pub engagement: f64,
    /// Accounts reached
    pub reach: u64,
}

/// A unit of content awaiting distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPost {
    /// Opaque unique identifier, never reused
    pub id: String,
    pub content: String,
    pub caption: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    /// Target platforms (non-empty)
    pub platforms: Vec<Platform>,
    /// Canonical instant the post is due
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_time: OffsetDateTime,
    /// IANA timezone the post was authored in
    pub timezone: String,
    pub status: PostStatus,
    #[serde(default)]
    pub recurrence: Recurrence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_recurrences: Option<u32>,
    #[serde(default)]
    pub recurrence_count: u32,
    #[serde(default)]
    pub retries: u32,
    pub max_retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub published_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<PostMetrics>,
}

impl ScheduledPost {
    pub const DEFAULT_MAX_RETRIES: u32 = 3;

    /// Generate a fresh post identifier
    pub fn new_id() -> String {
        format!("post-{}", Uuid::new_v4())
    }

    /// Whether the processor should pick this post up at `now`
    pub fn is_due(&self, now: OffsetDateTime) -> bool {
        self.status == PostStatus::Scheduled && self.scheduled_time <= now
    }

    /// Whether the lineage may spawn another occurrence
    pub fn can_recur(&self) -> bool {
        if self.recurrence.is_once() {
            return false;
        }
        match self.max_recurrences {
            Some(max) => self.recurrence_count < max,
            None => true,
        }
    }
}

/// A user request to schedule a post
#[derive(Debug, Clone)]
pub struct NewPost {
    pub content: String,
    pub caption: String,
    pub media_url: Option<String>,
    pub platforms: Vec<Platform>,
    pub scheduled_time: OffsetDateTime,
    pub timezone: String,
    pub recurrence: Recurrence,
    pub max_recurrences: Option<u32>,
    pub tags: Vec<String>,
    /// Overrides the configured retry budget
    pub max_retries: Option<u32>,
}

/// User-editable fields of a scheduled post
#[derive(Debug, Clone, Default)]
pub struct PostEdit {
    pub content: Option<String>,
    pub caption: Option<String>,
    pub media_url: Option<String>,
    pub platforms: Option<Vec<Platform>>,
    pub scheduled_time: Option<OffsetDateTime>,
    pub timezone: Option<String>,
    pub recurrence: Option<Recurrence>,
    pub max_recurrences: Option<u32>,
    pub tags: Option<Vec<String>>,
}

/// Partial update merged into a stored post; unset fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostPatch {
    pub content: Option<String>,
    pub caption: Option<String>,
    pub media_url: Option<String>,
    pub platforms: Option<Vec<Platform>>,
    pub scheduled_time: Option<OffsetDateTime>,
    pub timezone: Option<String>,
    pub status: Option<PostStatus>,
    pub recurrence: Option<Recurrence>,
    pub max_recurrences: Option<u32>,
    pub recurrence_count: Option<u32>,
    pub retries: Option<u32>,
    pub max_retries: Option<u32>,
    pub last_error: Option<String>,
    pub published_at: Option<OffsetDateTime>,
    pub tags: Option<Vec<String>>,
    pub metrics: Option<PostMetrics>,
}

impl PostPatch {
    /// Merge the set fields into `post`
    pub fn apply_to(self, post: &mut ScheduledPost) {
        if let Some(content) = self.content {
            post.content = content;
        }
        if let Some(caption) = self.caption {
            post.caption = caption;
        }
        if let Some(media_url) = self.media_url {
            post.media_url = Some(media_url);
        }
        if let Some(platforms) = self.platforms {
            post.platforms = platforms;
        }
        if let Some(scheduled_time) = self.scheduled_time {
            post.scheduled_time = scheduled_time;
        }
        if let Some(timezone) = self.timezone {
            post.timezone = timezone;
        }
        if let Some(status) = self.status {
            post.status = status;
        }
        if let Some(recurrence) = self.recurrence {
            post.recurrence = recurrence;
        }
        if let Some(max_recurrences) = self.max_recurrences {
            post.max_recurrences = Some(max_recurrences);
        }
        if let Some(recurrence_count) = self.recurrence_count {
            post.recurrence_count = recurrence_count;
        }
        if let Some(retries) = self.retries {
            post.retries = retries;
        }
        if let Some(max_retries) = self.max_retries {
            post.max_retries = max_retries;
        }
        if let Some(last_error) = self.last_error {
            post.last_error = Some(last_error);
        }
        if let Some(published_at) = self.published_at {
            post.published_at = Some(published_at);
        }
        if let Some(tags) = self.tags {
            post.tags = tags;
        }
        if let Some(metrics) = self.metrics {
            post.metrics = Some(metrics);
        }
    }
}

impl From<PostEdit> for PostPatch {
    fn from(edit: PostEdit) -> Self {
        Self {
            content: edit.content,
            caption: edit.caption,
            media_url: edit.media_url,
            platforms: edit.platforms,
            scheduled_time: edit.scheduled_time,
            timezone: edit.timezone,
            recurrence: edit.recurrence,
            max_recurrences: edit.max_recurrences,
            tags: edit.tags,
            ..Default::default()
        }
    }
}

/// Platform-ready content rendered from a scheduled post
#[derive(Debug, Clone, PartialEq)]
pub struct PostContent {
    pub platform: Platform,
    /// Text body, already fitted to the platform limit
    pub text: String,
    pub media_url: Option<String>,
    /// Id of the scheduled post this was rendered from
    pub post_id: String,
}

/// Result of publishing to one platform
#[derive(Debug, Clone)]
pub struct PublishReceipt {
    pub platform: Platform,
    /// Platform-specific post ID
    pub id: String,
    /// URL to the published content, if available
    pub url: Option<String>,
}

/// Static advisory record of a good posting slot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimalPostingTime {
    pub platform: Platform,
    pub day: &'static str,
    /// HH:MM
    pub time: &'static str,
    /// Expected engagement rate
    pub engagement: f64,
    /// Expected reach
    pub reach: u64,
    pub reason: &'static str,
}

/// Average engagement and reach over a group of posts
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GroupAverages {
    /// Posts in the group with recorded metrics
    pub samples: usize,
    pub avg_engagement: Option<f64>,
    pub avg_reach: Option<f64>,
}

/// Aggregates derived from the current store contents
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SchedulingStats {
    pub total_scheduled: usize,
    pub total_published: usize,
    pub total_failed: usize,
    pub total_cancelled: usize,
    /// Average engagement of published posts; `None` when nothing was recorded
    pub avg_engagement: Option<f64>,
    /// Published posts that were scheduled ahead of time
    pub scheduled: GroupAverages,
    /// Published posts that went out as soon as they were created
    pub immediate: GroupAverages,
}

/// Counts from one queue drain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DrainSummary {
    pub published: usize,
    pub retried: usize,
    pub failed: usize,
    /// Selected posts that were cancelled or removed before their result was recorded
    pub skipped: usize,
    /// New occurrences created for recurring posts
    pub spawned: usize,
}

impl DrainSummary {
    pub fn processed(&self) -> usize {
        self.published + self.retried + self.failed
    }
}

/// Result of asking the processor to drain the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    Completed(DrainSummary),
    /// Another drain was in flight, nothing was done
    AlreadyRunning,
}
