//! Configuration loading and management

use anyhow::{Context, Result};
use post_scheduler_adapters::store::DEFAULT_COLLECTION_KEY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub queue: QueueSettings,

    #[serde(default)]
    pub platforms: PlatformsConfig,

    #[serde(default)]
    pub outbox: OutboxConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_true")]
    pub dry_run: bool,

    #[serde(default = "default_timezone")]
    pub default_timezone: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    File,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_store_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_store_key")]
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSettings {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishMode {
    Api,
    #[default]
    Outbox,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformsConfig {
    #[serde(default)]
    pub twitter: TwitterConfig,

    #[serde(default)]
    pub instagram: InstagramConfig,

    #[serde(default)]
    pub tiktok: OutboxOnlyConfig,

    #[serde(default)]
    pub youtube: OutboxOnlyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitterConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_api_mode")]
    pub mode: PublishMode,

    #[serde(default = "default_twitter_token_env")]
    pub user_token_env: String,

    #[serde(default = "default_twitter_max_chars")]
    pub max_chars: usize,

    #[serde(default = "default_twitter_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstagramConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_api_mode")]
    pub mode: PublishMode,

    #[serde(default = "default_instagram_token_env")]
    pub access_token_env: String,

    #[serde(default)]
    pub user_id: String,

    #[serde(default = "default_instagram_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutboxOnlyConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub mode: PublishMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxConfig {
    #[serde(default = "default_outbox_path")]
    pub path: PathBuf,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./posts.sqlite")
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_store_key() -> String {
    DEFAULT_COLLECTION_KEY.to_string()
}

fn default_poll_interval() -> u64 {
    60
}

fn default_retry_delay() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    3
}

fn default_api_mode() -> PublishMode {
    PublishMode::Api
}

fn default_twitter_token_env() -> String {
    "TWITTER_USER_TOKEN".to_string()
}

fn default_twitter_max_chars() -> usize {
    280
}

fn default_twitter_base_url() -> String {
    "https://api.twitter.com".to_string()
}

fn default_instagram_token_env() -> String {
    "INSTAGRAM_ACCESS_TOKEN".to_string()
}

fn default_instagram_base_url() -> String {
    "https://graph.facebook.com/v19.0".to_string()
}

fn default_outbox_path() -> PathBuf {
    PathBuf::from("./outbox.jsonl")
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: default_true(),
            default_timezone: default_timezone(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            db_path: default_db_path(),
            dir: default_store_dir(),
            key: default_store_key(),
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            retry_delay_secs: default_retry_delay(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: default_api_mode(),
            user_token_env: default_twitter_token_env(),
            max_chars: default_twitter_max_chars(),
            base_url: default_twitter_base_url(),
        }
    }
}

impl Default for InstagramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: default_api_mode(),
            access_token_env: default_instagram_token_env(),
            user_id: String::new(),
            base_url: default_instagram_base_url(),
        }
    }
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            path: default_outbox_path(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("POST_SCHEDULER")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# post-scheduler configuration

[general]
log_level = "info"
# Log instead of publishing; --require-approval overrides this
dry_run = true
default_timezone = "UTC"

[store]
backend = "sqlite"  # sqlite, file, memory
db_path = "./posts.sqlite"
dir = "./data"
key = "socialai_scheduled_posts"

[queue]
poll_interval_secs = 60
retry_delay_secs = 300
max_retries = 3

[platforms.twitter]
enabled = false
mode = "api"  # api, outbox
user_token_env = "TWITTER_USER_TOKEN"
max_chars = 280
base_url = "https://api.twitter.com"

[platforms.instagram]
enabled = false
mode = "api"  # api, outbox
access_token_env = "INSTAGRAM_ACCESS_TOKEN"
user_id = ""
base_url = "https://graph.facebook.com/v19.0"

# TikTok and YouTube are published through the outbox only
[platforms.tiktok]
enabled = false
mode = "outbox"

[platforms.youtube]
enabled = false
mode = "outbox"

[outbox]
path = "./outbox.jsonl"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_toml_matches_defaults() {
        let parsed: AppConfig = toml::from_str(&AppConfig::example_toml()).expect("valid toml");
        let defaults = AppConfig::default();

        assert_eq!(parsed.store.backend, defaults.store.backend);
        assert_eq!(parsed.store.key, defaults.store.key);
        assert_eq!(parsed.queue.retry_delay_secs, 300);
        assert_eq!(parsed.queue.max_retries, 3);
        assert_eq!(parsed.platforms.twitter.mode, PublishMode::Api);
        assert_eq!(parsed.platforms.tiktok.mode, PublishMode::Outbox);
        assert!(parsed.general.dry_run);
        assert_eq!(parsed.general.default_timezone, "UTC");
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let parsed: AppConfig =
            toml::from_str("[store]\nbackend = \"file\"\n").expect("valid toml");

        assert_eq!(parsed.store.backend, StoreBackend::File);
        assert_eq!(parsed.store.key, "socialai_scheduled_posts");
        assert_eq!(parsed.queue.poll_interval_secs, 60);
        assert!(!parsed.platforms.instagram.enabled);
    }
}
