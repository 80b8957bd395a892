//! Post command - create, inspect and change scheduled posts

use anyhow::{Context, Result};
use post_scheduler_domain::{
    NewPost, PostEdit, PostMetrics, Recurrence, ScheduledPost,
    timezone::{local_to_utc, utc_to_local},
};
use std::path::PathBuf;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use crate::args::{AddPostArgs, EditPostArgs, PostArgs, PostCommands};
use crate::commands::{Service, scheduling_service};
use crate::config::AppConfig;

pub async fn execute(args: PostArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let service = scheduling_service(&config).await?;

    match args.command {
        PostCommands::Add(add) => add_post(&service, &config, add).await,
        PostCommands::List { status, json } => {
            let posts: Vec<_> = service
                .list()
                .await?
                .into_iter()
                .filter(|p| status.is_none_or(|s| p.status == s))
                .collect();
            print_posts(&posts, json)
        }
        PostCommands::Upcoming { days, json } => {
            print_posts(&service.upcoming(days).await?, json)
        }
        PostCommands::On {
            date,
            timezone,
            json,
        } => {
            let day = Date::parse(date.trim(), format_description!("[year]-[month]-[day]"))
                .with_context(|| format!("Invalid date (expected YYYY-MM-DD): {}", date))?;
            let timezone = timezone.unwrap_or_else(|| config.general.default_timezone.clone());
            print_posts(&service.posts_on(day, &timezone).await?, json)
        }
        PostCommands::Edit(edit) => edit_post(&service, edit).await,
        PostCommands::Cancel { id } => {
            let post = service.cancel(&id).await?;
            println!("Cancelled {}", post.id);
            Ok(())
        }
        PostCommands::Delete { id } => {
            service.delete(&id).await?;
            println!("Deleted {}", id);
            Ok(())
        }
        PostCommands::Metrics {
            id,
            engagement,
            reach,
        } => {
            let post = service
                .record_metrics(&id, PostMetrics { engagement, reach })
                .await?;
            println!(
                "Recorded metrics for {}: engagement {:.2}%, reach {}",
                post.id, engagement, reach
            );
            Ok(())
        }
    }
}

async fn add_post(service: &Service, config: &AppConfig, args: AddPostArgs) -> Result<()> {
    let timezone = args
        .timezone
        .unwrap_or_else(|| config.general.default_timezone.clone());

    let scheduled_time = match args.at.as_deref() {
        Some(at) => parse_when(at, &timezone)?,
        None => OffsetDateTime::now_utc(),
    };

    let recurrence = Recurrence::from_parts(&args.recurrence, args.interval_days)
        .map_err(anyhow::Error::msg)?;

    let post = service
        .schedule(NewPost {
            content: args.content,
            caption: args.caption,
            media_url: args.media_url,
            platforms: args.platforms,
            scheduled_time,
            timezone,
            recurrence,
            max_recurrences: args.max_recurrences,
            tags: args.tags,
            max_retries: args.max_retries,
        })
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&post)?);
    } else {
        println!(
            "Scheduled {} for {} {}",
            post.id,
            local_display(&post)?,
            post.timezone
        );
    }
    Ok(())
}

async fn edit_post(service: &Service, args: EditPostArgs) -> Result<()> {
    let scheduled_time = match args.at.as_deref() {
        Some(at) => {
            let timezone = match args.timezone.as_deref() {
                Some(timezone) => timezone.to_string(),
                None => service.get(&args.id).await?.timezone,
            };
            Some(parse_when(at, &timezone)?)
        }
        None => None,
    };

    let recurrence = match (args.recurrence.as_deref(), args.interval_days) {
        (Some(kind), interval) => {
            Some(Recurrence::from_parts(kind, interval).map_err(anyhow::Error::msg)?)
        }
        (None, Some(days)) => Some(Recurrence::Custom {
            interval_days: Some(days),
        }),
        (None, None) => None,
    };

    let post = service
        .edit(
            &args.id,
            PostEdit {
                content: args.content,
                caption: args.caption,
                media_url: args.media_url,
                platforms: args.platforms,
                scheduled_time,
                timezone: args.timezone,
                recurrence,
                max_recurrences: args.max_recurrences,
                tags: args.tags,
            },
        )
        .await?;

    println!(
        "Updated {} ({} {})",
        post.id,
        local_display(&post)?,
        post.timezone
    );
    Ok(())
}

/// Parse an RFC 3339 instant, or a "YYYY-MM-DD HH:MM" wall-clock time in `timezone`
fn parse_when(input: &str, timezone: &str) -> Result<OffsetDateTime> {
    let input = input.trim();
    if let Ok(instant) = OffsetDateTime::parse(input, &Rfc3339) {
        return Ok(instant);
    }

    let local = PrimitiveDateTime::parse(
        input,
        format_description!("[year]-[month]-[day] [hour]:[minute]"),
    )
    .or_else(|_| {
        PrimitiveDateTime::parse(
            input,
            format_description!("[year]-[month]-[day]T[hour]:[minute]"),
        )
    })
    .with_context(|| format!("Invalid time (expected \"YYYY-MM-DD HH:MM\"): {}", input))?;

    Ok(local_to_utc(local, timezone)?)
}

fn local_display(post: &ScheduledPost) -> Result<String> {
    let local = utc_to_local(post.scheduled_time, &post.timezone)?;
    Ok(local.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))?)
}

fn print_posts(posts: &[ScheduledPost], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(posts)?);
        return Ok(());
    }

    if posts.is_empty() {
        println!("No posts");
        return Ok(());
    }

    for post in posts {
        let platforms: Vec<_> = post.platforms.iter().map(|p| p.as_str()).collect();
        let text = if post.caption.is_empty() {
            &post.content
        } else {
            &post.caption
        };
        let preview: String = text.chars().take(40).collect();

        println!(
            "{}  {:<9}  {} {:<19}  {:<24}  {:<8}  {}",
            post.id,
            post.status.as_str(),
            local_display(post)?,
            post.timezone,
            platforms.join(","),
            post.recurrence.to_string(),
            preview.replace('\n', " ")
        );
        if let Some(error) = &post.last_error {
            println!(
                "    last error (retry {}/{}): {}",
                post.retries, post.max_retries, error
            );
        }
    }
    Ok(())
}
