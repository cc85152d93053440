use chrono::DateTime;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("{} {}", count, unit)
    } else {
        format!("{} {}s", count, unit)
    }
}

/// Format a session length, e.g. "1 hour, 5 seconds".
///
/// Zero components are skipped; a zero or negative duration is "0 seconds".
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    let parts: Vec<String> = [(hours, "hour"), (minutes, "minute"), (secs, "second")]
        .into_iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, unit)| plural(count, unit))
        .collect();

    if parts.is_empty() {
        plural(0, "second")
    } else {
        parts.join(", ")
    }
}

/// Playtime as reported by the game server: whole minutes below an hour,
/// fractional hours above.
pub fn format_playtime(seconds: u64) -> String {
    if seconds < 3600 {
        format!("{:.0} minutes", seconds as f64 / 60.0)
    } else {
        format!("{:.2} hours", seconds as f64 / 3600.0)
    }
}

/// Unix timestamp as "YYYY-MM-DD HH:MM:SS UTC".
pub fn format_timestamp(unix: i64) -> String {
    match DateTime::from_timestamp(unix, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => unix.to_string(),
    }
}

/// Chat mention for a user id.
pub fn mention(user_id: &str) -> String {
    format!("<@{}>", user_id)
}
