//! Recurrence engine: when does a recurring post come around again

use time::{Date, Duration, Month, OffsetDateTime};

use crate::model::Recurrence;

/// Compute the next occurrence of `rule` after `from`.
///
/// Daily, weekly and custom rules are fixed offsets of whole 24h days. Monthly keeps the
/// day-of-month and time of day; when the next month is shorter the date is clamped to
/// its last day (Jan 31 -> Feb 28).
pub fn next_occurrence(rule: Recurrence, from: OffsetDateTime) -> Option<OffsetDateTime> {
    match rule {
        Recurrence::Once => None,
        Recurrence::Daily => from.checked_add(Duration::days(1)),
        Recurrence::Weekly => from.checked_add(Duration::weeks(1)),
        Recurrence::Monthly => add_one_month(from),
        Recurrence::Custom {
            interval_days: Some(days),
        } if days > 0 => from.checked_add(Duration::days(i64::from(days))),
        Recurrence::Custom { .. } => None,
    }
}

fn add_one_month(from: OffsetDateTime) -> Option<OffsetDateTime> {
    let date = from.date();
    let (year, month) = match date.month() {
        Month::December => (date.year().checked_add(1)?, Month::January),
        month => (date.year(), month.next()),
    };

    let mut day = date.day();
    let next = loop {
        match Date::from_calendar_date(year, month, day) {
            Ok(next) => break next,
            Err(_) if day > 28 => day -= 1,
            Err(_) => return None,
        }
    };

    Some(from.replace_date(next))
}
