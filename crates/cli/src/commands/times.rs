//! Times command - recommended posting slots per platform

use anyhow::Result;
use post_scheduler_domain::optimal_posting_times;

use crate::args::TimesArgs;

pub fn execute(args: TimesArgs) -> Result<()> {
    let times: Vec<_> = optimal_posting_times()
        .into_iter()
        .filter(|t| args.platform.is_none_or(|p| t.platform == p))
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&times)?);
        return Ok(());
    }

    for slot in &times {
        println!(
            "{:<10} {:<9} {}  engagement {:.1}%  reach {:<6}  {}",
            slot.platform.as_str(),
            slot.day,
            slot.time,
            slot.engagement,
            slot.reach,
            slot.reason
        );
    }

    Ok(())
}
