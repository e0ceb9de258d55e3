//! Day-bucketing helpers for millisecond epoch timestamps.
//!
//! The `date` column of `usage_sessions` stores the local-midnight timestamp
//! of the day a session started. Bucketing uses the device's local timezone;
//! this convention is part of the on-disk format and must not change.

use chrono::{DateTime, Local, NaiveTime, TimeZone};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Truncates a timestamp to local midnight of the same day.
pub fn start_of_day_ms(timestamp_ms: i64) -> i64 {
    let Some(dt) = local_datetime(timestamp_ms) else {
        // Out-of-range timestamp; fall back to UTC-aligned truncation.
        return timestamp_ms - timestamp_ms.rem_euclid(DAY_MS);
    };
    let midnight = dt.date_naive().and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|m| m.timestamp_millis())
        .unwrap_or_else(|| timestamp_ms - timestamp_ms.rem_euclid(DAY_MS))
}

/// Last millisecond of the local day containing the timestamp.
pub fn end_of_day_ms(timestamp_ms: i64) -> i64 {
    start_of_day_ms(timestamp_ms) + DAY_MS - 1
}

pub fn is_same_day(a_ms: i64, b_ms: i64) -> bool {
    match (local_datetime(a_ms), local_datetime(b_ms)) {
        (Some(a), Some(b)) => a.date_naive() == b.date_naive(),
        _ => false,
    }
}

/// Formats a duration as `H:MM:SS`, or `MM:SS` under an hour.
pub fn format_duration(milliseconds: i64) -> String {
    let total_seconds = milliseconds.max(0) / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

fn local_datetime(timestamp_ms: i64) -> Option<DateTime<Local>> {
    Local.timestamp_millis_opt(timestamp_ms).single()
}
