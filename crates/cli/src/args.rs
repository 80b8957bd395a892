//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use post_scheduler_domain::{Platform, PostStatus};
use std::path::PathBuf;

/// post-scheduler: schedule posts and publish them to social platforms when due
#[derive(Parser, Debug)]
#[command(name = "post-scheduler")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch the queue and publish posts as they come due
    Run(RunArgs),

    /// Create, inspect and change scheduled posts
    Post(PostArgs),

    /// Show scheduling statistics
    Stats(StatsArgs),

    /// Show recommended posting times per platform
    Times(TimesArgs),

    /// List supported timezones with their current local time
    Timezones,

    /// Configuration management
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Run in dry-run mode (no actual publishing)
    #[arg(long)]
    pub dry_run: bool,

    /// Drain the queue once and exit
    #[arg(long)]
    pub once: bool,

    /// Write posts to the outbox file for review instead of publishing
    #[arg(long)]
    pub require_approval: bool,

    /// Path to outbox file (used with --require-approval)
    #[arg(long)]
    pub outbox: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PostArgs {
    #[command(subcommand)]
    pub command: PostCommands,
}

#[derive(Subcommand, Debug)]
pub enum PostCommands {
    /// Schedule a new post
    Add(AddPostArgs),

    /// List stored posts
    List {
        /// Only show posts with this status
        #[arg(long)]
        status: Option<PostStatus>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Scheduled posts due within the next N days
    Upcoming {
        #[arg(long, default_value_t = 7)]
        days: u32,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Scheduled posts falling on a calendar day (YYYY-MM-DD)
    On {
        date: String,

        /// Timezone the day is interpreted in (defaults to general.default_timezone)
        #[arg(long)]
        timezone: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change a post that has not been published yet
    Edit(EditPostArgs),

    /// Cancel a scheduled post
    Cancel { id: String },

    /// Remove a post from the store
    Delete { id: String },

    /// Record engagement for a published post
    Metrics {
        id: String,

        /// Engagement rate in percent
        #[arg(long)]
        engagement: f64,

        /// Accounts reached
        #[arg(long)]
        reach: u64,
    },
}

#[derive(Args, Debug)]
pub struct AddPostArgs {
    /// Caption text published with the post
    #[arg(long)]
    pub caption: String,

    /// Content reference (used as text when no caption is given)
    #[arg(long, default_value = "")]
    pub content: String,

    /// Image or video URL
    #[arg(long)]
    pub media_url: Option<String>,

    /// Target platforms, comma separated (twitter, instagram, tiktok, youtube)
    #[arg(long, value_delimiter = ',', required = true)]
    pub platforms: Vec<Platform>,

    /// Local publish time "YYYY-MM-DD HH:MM" or RFC 3339; omit to publish on the next drain
    #[arg(long)]
    pub at: Option<String>,

    /// IANA timezone for --at (defaults to general.default_timezone)
    #[arg(long)]
    pub timezone: Option<String>,

    /// once, daily, weekly, monthly or custom
    #[arg(long, default_value = "once")]
    pub recurrence: String,

    /// Days between occurrences for custom recurrence
    #[arg(long)]
    pub interval_days: Option<u32>,

    /// Maximum number of additional occurrences
    #[arg(long)]
    pub max_recurrences: Option<u32>,

    /// Hashtags, comma separated
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Override the configured retry budget
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Output the created post as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct EditPostArgs {
    pub id: String,

    #[arg(long)]
    pub caption: Option<String>,

    #[arg(long)]
    pub content: Option<String>,

    #[arg(long)]
    pub media_url: Option<String>,

    #[arg(long, value_delimiter = ',')]
    pub platforms: Option<Vec<Platform>>,

    /// New local publish time "YYYY-MM-DD HH:MM" or RFC 3339
    #[arg(long)]
    pub at: Option<String>,

    #[arg(long)]
    pub timezone: Option<String>,

    #[arg(long)]
    pub recurrence: Option<String>,

    #[arg(long)]
    pub interval_days: Option<u32>,

    #[arg(long)]
    pub max_recurrences: Option<u32>,

    #[arg(long, value_delimiter = ',')]
    pub tags: Option<Vec<String>>,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct TimesArgs {
    /// Only show this platform
    #[arg(long)]
    pub platform: Option<Platform>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./config.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration (file plus environment overrides)
    Show,
}
