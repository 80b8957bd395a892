//! Timezone adapter: converts between authored wall-clock times and canonical instants

use chrono::{DateTime, LocalResult, NaiveDate, Offset, TimeZone};
use chrono_tz::Tz;
use thiserror::Error;
use time::{Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::ports::Clock;

/// Timezones offered for selection when scheduling
pub const SUPPORTED_TIMEZONES: [&str; 14] = [
    "UTC",
    "America/New_York",
    "America/Chicago",
    "America/Denver",
    "America/Los_Angeles",
    "Europe/London",
    "Europe/Paris",
    "Europe/Berlin",
    "Asia/Tokyo",
    "Asia/Singapore",
    "Asia/Dubai",
    "Australia/Sydney",
    "Australia/Melbourne",
    "Pacific/Auckland",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimezoneError {
    #[error("Unknown timezone: {0}")]
    Unknown(String),
    #[error("{local} does not exist in {timezone} (clocks skip forward)")]
    NonExistent { local: String, timezone: String },
    #[error("Date out of range: {0}")]
    OutOfRange(String),
}

pub fn supported_timezones() -> &'static [&'static str] {
    &SUPPORTED_TIMEZONES
}

/// Resolve an IANA timezone name
pub fn parse_timezone(name: &str) -> Result<Tz, TimezoneError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| TimezoneError::Unknown(name.to_string()))
}

/// Convert a wall-clock time authored in `timezone` to its UTC instant.
///
/// Times that occur twice (clocks falling back) resolve to the earlier instant.
pub fn local_to_utc(
    local: PrimitiveDateTime,
    timezone: &str,
) -> Result<OffsetDateTime, TimezoneError> {
    let tz = parse_timezone(timezone)?;

    let naive = NaiveDate::from_ymd_opt(
        local.year(),
        u32::from(u8::from(local.month())),
        u32::from(local.day()),
    )
    .and_then(|date| {
        date.and_hms_nano_opt(
            u32::from(local.hour()),
            u32::from(local.minute()),
            u32::from(local.second()),
            local.nanosecond(),
        )
    })
    .ok_or_else(|| TimezoneError::OutOfRange(local.to_string()))?;

    let resolved = match tz.from_local_datetime(&naive) {
        LocalResult::Single(resolved) => resolved,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            return Err(TimezoneError::NonExistent {
                local: local.to_string(),
                timezone: timezone.to_string(),
            });
        }
    };

    OffsetDateTime::from_unix_timestamp(resolved.timestamp())
        .map(|instant| {
            instant + Duration::nanoseconds(i64::from(resolved.timestamp_subsec_nanos()))
        })
        .map_err(|e| TimezoneError::OutOfRange(e.to_string()))
}

/// View an instant as wall-clock time in `timezone`
pub fn utc_to_local(
    instant: OffsetDateTime,
    timezone: &str,
) -> Result<OffsetDateTime, TimezoneError> {
    let tz = parse_timezone(timezone)?;

    let utc = DateTime::from_timestamp(instant.unix_timestamp(), instant.nanosecond())
        .ok_or_else(|| TimezoneError::OutOfRange(instant.to_string()))?;
    let offset_secs = tz
        .offset_from_utc_datetime(&utc.naive_utc())
        .fix()
        .local_minus_utc();
    let offset = UtcOffset::from_whole_seconds(offset_secs)
        .map_err(|e| TimezoneError::OutOfRange(e.to_string()))?;

    Ok(instant.to_offset(offset))
}

/// Current wall-clock time in `timezone`
pub fn now_in(clock: &dyn Clock, timezone: &str) -> Result<OffsetDateTime, TimezoneError> {
    utc_to_local(clock.now(), timezone)
}
