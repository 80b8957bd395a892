//! Outbox publisher for require-approval mode
//!
//! Instead of calling a platform, each rendered post is appended as one JSON
//! line to a local file for a human to review and post by hand.

use async_trait::async_trait;
use post_scheduler_domain::{Platform, PlatformPublisher, PostContent, PublishError, PublishReceipt};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Shared append-only JSONL file
#[derive(Debug, Clone)]
pub struct OutboxWriter {
    path: PathBuf,
    file: Arc<Mutex<tokio::fs::File>>,
}

impl OutboxWriter {
    pub async fn new(path: PathBuf) -> Result<Self, OutboxError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, entry: &OutboxEntry<'_>) -> Result<(), OutboxError> {
        let line = serde_json::to_string(entry)?;
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}

/// Writes posts for one platform to the outbox
#[derive(Debug, Clone)]
pub struct OutboxPublisher {
    writer: OutboxWriter,
    platform: Platform,
}

impl OutboxPublisher {
    pub fn new(writer: OutboxWriter, platform: Platform) -> Self {
        Self { writer, platform }
    }
}

#[derive(Serialize)]
struct OutboxEntry<'a> {
    id: String,
    platform: Platform,
    post_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    media_url: Option<&'a str>,
    #[serde(with = "time::serde::rfc3339")]
    queued_at: OffsetDateTime,
}

#[async_trait]
impl PlatformPublisher for OutboxPublisher {
    async fn publish(&self, content: &PostContent) -> Result<PublishReceipt, PublishError> {
        let entry = OutboxEntry {
            id: Uuid::new_v4().to_string(),
            platform: self.platform,
            post_id: &content.post_id,
            text: &content.text,
            media_url: content.media_url.as_deref(),
            queued_at: OffsetDateTime::now_utc(),
        };

        self.writer
            .append(&entry)
            .await
            .map_err(|error| PublishError::Api(format!("Outbox write failed: {}", error)))?;

        tracing::info!(
            platform = %self.platform,
            post_id = %content.post_id,
            outbox = %self.writer.path().display(),
            "Queued post for manual approval"
        );

        Ok(PublishReceipt {
            platform: self.platform,
            id: entry.id,
            url: None,
        })
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn platform(&self) -> Platform {
        self.platform
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::TempDir;

    #[tokio::test]
    async fn outbox_publisher_writes_jsonl_entries() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("out").join("outbox.jsonl");

        let writer = OutboxWriter::new(path.clone()).await.expect("writer");
        let twitter = OutboxPublisher::new(writer.clone(), Platform::Twitter);
        let instagram = OutboxPublisher::new(writer, Platform::Instagram);

        let receipt = twitter
            .publish(&PostContent {
                platform: Platform::Twitter,
                text: "Launch day\n\n#rust".to_string(),
                media_url: None,
                post_id: "post-1".to_string(),
            })
            .await
            .expect("publish");
        assert!(!receipt.id.is_empty());
        assert_eq!(receipt.platform, Platform::Twitter);

        instagram
            .publish(&PostContent {
                platform: Platform::Instagram,
                text: "Launch day".to_string(),
                media_url: Some("https://cdn.example.com/a.jpg".to_string()),
                post_id: "post-1".to_string(),
            })
            .await
            .expect("publish");

        let contents = tokio::fs::read_to_string(&path).await.expect("read outbox");
        let lines: Vec<Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).expect("valid json"))
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["platform"], "twitter");
        assert_eq!(lines[0]["post_id"], "post-1");
        assert_eq!(lines[0]["text"], "Launch day\n\n#rust");
        assert!(lines[0].get("media_url").is_none());
        assert_eq!(lines[1]["platform"], "instagram");
        assert_eq!(lines[1]["media_url"], "https://cdn.example.com/a.jpg");
    }
}
