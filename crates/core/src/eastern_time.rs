//! US Eastern wall-clock formatting for "last saved" and completion times.
//!
//! The practice operates in a single time zone, so the offset is derived
//! from the post-2007 US DST rule rather than a tz database: daylight time
//! runs from the second Sunday of March at 02:00 EST until the first Sunday
//! of November at 02:00 EDT.

use chrono::{Datelike, FixedOffset, NaiveDate, Weekday};

use crate::types::Timestamp;

const EST_OFFSET_SECS: i32 = 5 * 3600;
const EDT_OFFSET_SECS: i32 = 4 * 3600;

/// Whether `ts` falls inside Eastern daylight time.
pub fn is_eastern_dst(ts: Timestamp) -> bool {
    let year = ts.year();
    // 02:00 EST = 07:00 UTC; 02:00 EDT = 06:00 UTC.
    let start = transition_utc(year, 3, 2, 7);
    let end = transition_utc(year, 11, 1, 6);
    match (start, end) {
        (Some(start), Some(end)) => ts >= start && ts < end,
        _ => false,
    }
}

/// Format `ts` as `MM/DD/YYYY, h:mm AM EST` (or `EDT`).
pub fn format_eastern(ts: Timestamp) -> String {
    let (offset_secs, abbrev) = if is_eastern_dst(ts) {
        (EDT_OFFSET_SECS, "EDT")
    } else {
        (EST_OFFSET_SECS, "EST")
    };
    match FixedOffset::west_opt(offset_secs) {
        Some(offset) => format!(
            "{} {abbrev}",
            ts.with_timezone(&offset).format("%m/%d/%Y, %-I:%M %p")
        ),
        None => ts.format("%m/%d/%Y, %-I:%M %p UTC").to_string(),
    }
}

/// UTC instant of the `nth` Sunday of `month` at `hour_utc`.
fn transition_utc(year: i32, month: u32, nth: u8, hour_utc: u32) -> Option<Timestamp> {
    NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Sun, nth)?
        .and_hms_opt(hour_utc, 0, 0)
        .map(|naive| naive.and_utc())
}
