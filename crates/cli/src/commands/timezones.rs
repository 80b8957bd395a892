//! Timezones command - supported zones and their current wall-clock time

use anyhow::Result;
use post_scheduler_domain::{
    SystemClock,
    timezone::{now_in, supported_timezones},
};
use time::macros::format_description;

pub fn execute() -> Result<()> {
    let clock = SystemClock;

    for name in supported_timezones() {
        let local = now_in(&clock, name)?;
        let offset = local.offset();
        println!(
            "{:<20} UTC{}{:02}:{:02}  {}",
            name,
            if offset.is_negative() { '-' } else { '+' },
            offset.whole_hours().abs(),
            offset.minutes_past_hour().abs(),
            local.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))?
        );
    }

    Ok(())
}
