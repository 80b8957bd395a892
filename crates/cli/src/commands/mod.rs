//! Subcommand implementations and shared wiring

pub mod config;
pub mod post;
pub mod run;
pub mod stats;
pub mod times;
pub mod timezones;

use anyhow::{Context, Result, bail};
use post_scheduler_adapters::{
    kv::{FileKeyValueStore, InMemoryKeyValueStore, SqliteKeyValueStore},
    store::CollectionPostStore,
};
use post_scheduler_domain::{
    PostStore, SystemClock,
    usecases::{SchedulingConfig, SchedulingService},
};
use secrecy::SecretString;
use std::sync::Arc;

use crate::config::{AppConfig, StoreBackend};

pub(crate) type Service = SchedulingService<dyn PostStore, SystemClock>;

/// Open the configured post store backend
pub(crate) async fn open_store(config: &AppConfig) -> Result<Arc<dyn PostStore>> {
    let key = config.store.key.clone();

    let store: Arc<dyn PostStore> = match config.store.backend {
        StoreBackend::Sqlite => {
            let kv = SqliteKeyValueStore::new(&config.store.db_path)
                .await
                .with_context(|| {
                    format!(
                        "Failed to open SQLite store: {}",
                        config.store.db_path.display()
                    )
                })?;
            Arc::new(CollectionPostStore::with_key(kv, key))
        }
        StoreBackend::File => {
            let kv = FileKeyValueStore::new(config.store.dir.clone())
                .await
                .with_context(|| {
                    format!("Failed to open file store: {}", config.store.dir.display())
                })?;
            Arc::new(CollectionPostStore::with_key(kv, key))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; posts are lost when the process exits");
            Arc::new(CollectionPostStore::with_key(InMemoryKeyValueStore::new(), key))
        }
    };

    tracing::debug!(backend = ?config.store.backend, "Opened post store");
    Ok(store)
}

pub(crate) async fn scheduling_service(config: &AppConfig) -> Result<Service> {
    let store = open_store(config).await?;
    Ok(SchedulingService::new(
        store,
        Arc::new(SystemClock),
        SchedulingConfig {
            max_retries: config.queue.max_retries,
        },
    ))
}

pub(crate) fn load_api_key(env_var: &str, provider: &str) -> Result<SecretString> {
    if env_var.trim().is_empty() {
        bail!("No token env var configured for {}", provider);
    }

    let key = std::env::var(env_var)
        .with_context(|| format!("Missing token env var {} for {}", env_var, provider))?;

    if key.trim().is_empty() {
        bail!("Token env var {} is empty for {}", env_var, provider);
    }

    Ok(SecretString::new(key.into()))
}
