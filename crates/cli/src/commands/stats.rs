//! Stats command - aggregate counts and engagement from the store

use anyhow::Result;
use post_scheduler_domain::{GroupAverages, SchedulingStats};
use std::path::PathBuf;

use crate::args::StatsArgs;
use crate::commands::scheduling_service;
use crate::config::AppConfig;

pub async fn execute(args: StatsArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let service = scheduling_service(&config).await?;

    let stats = service.stats().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats(&stats);
    }

    Ok(())
}

fn print_stats(stats: &SchedulingStats) {
    println!("Scheduled:  {}", stats.total_scheduled);
    println!("Published:  {}", stats.total_published);
    println!("Failed:     {}", stats.total_failed);
    println!("Cancelled:  {}", stats.total_cancelled);
    println!("Avg engagement: {}", percent(stats.avg_engagement));
    println!();
    println!("Scheduled ahead vs. posted immediately:");
    print_group("scheduled", &stats.scheduled);
    print_group("immediate", &stats.immediate);
}

fn print_group(label: &str, group: &GroupAverages) {
    let reach = group
        .avg_reach
        .map(|r| format!("{:.0}", r))
        .unwrap_or_else(|| "n/a".to_string());
    println!(
        "  {:<10} samples {:<4} engagement {:<8} reach {}",
        label,
        group.samples,
        percent(group.avg_engagement),
        reach
    );
}

fn percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}%", v))
        .unwrap_or_else(|| "n/a".to_string())
}
