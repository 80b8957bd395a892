//! Run command - watch the queue and publish due posts

use anyhow::{Context, Result, bail};
use post_scheduler_adapters::{
    outbox::{OutboxPublisher, OutboxWriter},
    platforms::{InstagramPublisher, StubPublisher, TwitterPublisher},
};
use post_scheduler_domain::{
    DrainOutcome, Platform, PlatformPublisher, PostStore, SystemClock,
    usecases::{BackgroundScheduler, PlatformRouter, QueueConfig, QueueProcessor},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

use crate::args::RunArgs;
use crate::commands::{load_api_key, open_store};
use crate::config::{AppConfig, PublishMode, QueueSettings};

type Processor = QueueProcessor<dyn PostStore, SystemClock>;

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let require_approval = args.require_approval;
    let outbox_path = args
        .outbox
        .clone()
        .unwrap_or_else(|| config.outbox.path.clone());

    if args.outbox.is_some() && !require_approval {
        tracing::warn!("--outbox is ignored without --require-approval");
    }

    let mut dry_run = args.dry_run || config.general.dry_run;
    if require_approval && dry_run {
        tracing::info!("--require-approval overrides dry-run");
        dry_run = false;
    }

    tracing::info!(
        dry_run = dry_run,
        once = args.once,
        require_approval = require_approval,
        backend = ?config.store.backend,
        "Starting post-scheduler run"
    );

    let store = open_store(&config).await?;
    let clock = Arc::new(SystemClock);

    let mut wiring = PublisherWiring {
        config: &config,
        dry_run,
        require_approval,
        outbox_path,
        writer: None,
    };
    let router = PlatformRouter::new(
        wiring.build(Platform::Twitter).await?,
        wiring.build(Platform::Instagram).await?,
        wiring.build(Platform::Tiktok).await?,
        wiring.build(Platform::Youtube).await?,
    );

    let enabled = router.enabled_platforms();
    if enabled.is_empty() {
        tracing::warn!("No platforms enabled; due posts will fail until one is configured");
    } else {
        tracing::info!(platforms = ?enabled, "Publishing enabled");
    }

    let processor: Processor = QueueProcessor::new(
        Arc::clone(&store),
        Arc::clone(&clock),
        queue_config(&config.queue)?,
    );

    if args.once {
        tracing::info!("Running single queue drain");
        let outcome = processor
            .process_queue(&router)
            .await
            .context("Queue drain failed")?;

        if let DrainOutcome::Completed(summary) = outcome {
            println!(
                "published: {}  retried: {}  failed: {}  skipped: {}  spawned: {}",
                summary.published,
                summary.retried,
                summary.failed,
                summary.skipped,
                summary.spawned
            );
        }
        return Ok(());
    }

    let mut scheduler = BackgroundScheduler::new(
        store,
        clock,
        Duration::from_secs(config.queue.poll_interval_secs.max(1)),
    );
    let mut due_events = scheduler.subscribe();
    scheduler.start();

    // Catch up on anything that came due while we were not running
    drain(&processor, &router).await;

    // Set up graceful shutdown
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = due_events.recv() => {
                match event {
                    Ok(ready) => {
                        tracing::debug!(count = ready.posts.len(), "Due posts detected");
                        drain(&processor, &router).await;
                    }
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed = missed, "Missed due-post notifications");
                        drain(&processor, &router).await;
                    }
                    Err(RecvError::Closed) => {
                        tracing::warn!("Background scheduler channel closed");
                        break;
                    }
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutting down gracefully");
                break;
            }
        }
    }

    scheduler.stop().await;
    tracing::info!("post-scheduler run completed");
    Ok(())
}

fn queue_config(settings: &QueueSettings) -> Result<QueueConfig> {
    let secs = i64::try_from(settings.retry_delay_secs).with_context(|| {
        format!(
            "queue.retry_delay_secs is too large: {}",
            settings.retry_delay_secs
        )
    })?;
    Ok(QueueConfig {
        retry_delay: time::Duration::seconds(secs),
    })
}

async fn drain(processor: &Processor, router: &PlatformRouter) {
    match processor.process_queue(router).await {
        Ok(DrainOutcome::Completed(summary)) => {
            if summary.processed() > 0 || summary.skipped > 0 {
                tracing::info!(
                    published = summary.published,
                    retried = summary.retried,
                    failed = summary.failed,
                    "Queue drain complete"
                );
            }
        }
        Ok(DrainOutcome::AlreadyRunning) => {
            tracing::debug!("Drain already in progress");
        }
        Err(e) => {
            tracing::error!(error = %e, "Queue drain failed");
        }
    }
}

/// Chooses the publisher for each platform from config and run flags
struct PublisherWiring<'a> {
    config: &'a AppConfig,
    dry_run: bool,
    require_approval: bool,
    outbox_path: PathBuf,
    writer: Option<OutboxWriter>,
}

impl PublisherWiring<'_> {
    async fn build(&mut self, platform: Platform) -> Result<Arc<dyn PlatformPublisher>> {
        let config = self.config;
        let platforms = &config.platforms;
        let (enabled, mode) = match platform {
            Platform::Twitter => (platforms.twitter.enabled, platforms.twitter.mode),
            Platform::Instagram => (platforms.instagram.enabled, platforms.instagram.mode),
            Platform::Tiktok => (platforms.tiktok.enabled, platforms.tiktok.mode),
            Platform::Youtube => (platforms.youtube.enabled, platforms.youtube.mode),
        };

        if !enabled {
            return Ok(Arc::new(StubPublisher::disabled(platform)));
        }

        if self.require_approval || mode == PublishMode::Outbox {
            let writer = self.outbox_writer().await?;
            return Ok(Arc::new(OutboxPublisher::new(writer, platform)));
        }

        if self.dry_run {
            return Ok(Arc::new(StubPublisher::new(platform)));
        }

        match platform {
            Platform::Twitter => {
                let twitter = &platforms.twitter;
                let token = load_api_key(&twitter.user_token_env, "twitter")?;
                Ok(Arc::new(TwitterPublisher::with_base_url(
                    token,
                    twitter.base_url.clone(),
                    twitter.max_chars,
                    true,
                )))
            }
            Platform::Instagram => {
                let instagram = &platforms.instagram;
                if instagram.user_id.trim().is_empty() {
                    bail!("Instagram enabled but platforms.instagram.user_id is not set");
                }
                let token = load_api_key(&instagram.access_token_env, "instagram")?;
                Ok(Arc::new(InstagramPublisher::with_base_url(
                    token,
                    instagram.user_id.clone(),
                    instagram.base_url.clone(),
                    true,
                )))
            }
            Platform::Tiktok | Platform::Youtube => {
                bail!("{} only supports outbox mode", platform)
            }
        }
    }

    async fn outbox_writer(&mut self) -> Result<OutboxWriter> {
        if let Some(writer) = &self.writer {
            return Ok(writer.clone());
        }

        let writer = OutboxWriter::new(self.outbox_path.clone())
            .await
            .with_context(|| {
                format!(
                    "Failed to initialize outbox writer: {}",
                    self.outbox_path.display()
                )
            })?;
        tracing::info!(outbox = %self.outbox_path.display(), "Writing approvals to outbox");
        self.writer = Some(writer.clone());
        Ok(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_config_converts_retry_delay() {
        let settings = QueueSettings {
            retry_delay_secs: 90,
            ..Default::default()
        };
        let config = queue_config(&settings).unwrap();
        assert_eq!(config.retry_delay, time::Duration::seconds(90));
    }

    #[test]
    fn queue_config_rejects_delay_beyond_i64() {
        let settings = QueueSettings {
            retry_delay_secs: u64::MAX,
            ..Default::default()
        };
        let err = queue_config(&settings).unwrap_err();
        assert!(err.to_string().contains("retry_delay_secs"));
    }
}
