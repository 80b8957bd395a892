//! Post store that keeps the whole collection as one JSON document
//!
//! Every mutation rewrites the full array under a single key of the
//! underlying [`KeyValueStore`] before returning.

use async_trait::async_trait;
use post_scheduler_domain::{
    KeyValueStore, PostPatch, PostStatus, PostStore, ScheduledPost, StoreError, ValidationError,
};
use tokio::sync::Mutex;

/// Default namespace key for the serialized collection
pub const DEFAULT_COLLECTION_KEY: &str = "socialai_scheduled_posts";

pub struct CollectionPostStore<K> {
    kv: K,
    key: String,
    // Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl<K: KeyValueStore> CollectionPostStore<K> {
    pub fn new(kv: K) -> Self {
        Self::with_key(kv, DEFAULT_COLLECTION_KEY)
    }

    pub fn with_key(kv: K, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    async fn load(&self) -> Result<Vec<ScheduledPost>, StoreError> {
        match self.kv.get(&self.key).await? {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)
                .map_err(|e| StoreError::Serialization(format!("{}: {}", self.key, e))),
            _ => Ok(Vec::new()),
        }
    }

    async fn save(&self, posts: &[ScheduledPost]) -> Result<(), StoreError> {
        let raw =
            serde_json::to_string(posts).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.kv.set(&self.key, &raw).await?;
        tracing::trace!(key = %self.key, count = posts.len(), "Persisted post collection");
        Ok(())
    }
}

fn check_required(post: &ScheduledPost) -> Result<(), ValidationError> {
    if post.id.trim().is_empty() {
        return Err(ValidationError::MissingField("id"));
    }
    if post.platforms.is_empty() {
        return Err(ValidationError::MissingField("platforms"));
    }
    if post.timezone.trim().is_empty() {
        return Err(ValidationError::MissingField("timezone"));
    }
    Ok(())
}

#[async_trait]
impl<K: KeyValueStore> PostStore for CollectionPostStore<K> {
    async fn create(&self, post: &ScheduledPost) -> Result<(), StoreError> {
        check_required(post)?;

        let _guard = self.write_lock.lock().await;
        let mut posts = self.load().await?;
        if posts.iter().any(|p| p.id == post.id) {
            return Err(ValidationError::DuplicateId(post.id.clone()).into());
        }
        posts.push(post.clone());
        self.save(&posts).await
    }

    async fn list(&self) -> Result<Vec<ScheduledPost>, StoreError> {
        self.load().await
    }

    async fn get(&self, id: &str) -> Result<Option<ScheduledPost>, StoreError> {
        Ok(self.load().await?.into_iter().find(|p| p.id == id))
    }

    async fn update(&self, id: &str, patch: PostPatch) -> Result<ScheduledPost, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut posts = self.load().await?;
        let post = posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        patch.apply_to(post);
        let updated = post.clone();
        self.save(&posts).await?;
        Ok(updated)
    }

    async fn update_if_status(
        &self,
        id: &str,
        expected: PostStatus,
        patch: PostPatch,
    ) -> Result<Option<ScheduledPost>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut posts = self.load().await?;
        let post = posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if post.status != expected {
            return Ok(None);
        }
        patch.apply_to(post);
        let updated = post.clone();
        self.save(&posts).await?;
        Ok(Some(updated))
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut posts = self.load().await?;
        let before = posts.len();
        posts.retain(|p| p.id != id);
        if posts.len() == before {
            return Ok(());
        }
        self.save(&posts).await
    }
}
