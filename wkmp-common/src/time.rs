//! Timestamp utilities

use chrono::{DateTime, TimeZone, Utc};
use std::time::Duration;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Timestamp as milliseconds since the Unix epoch (storage format)
pub fn to_epoch_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// Parse milliseconds since the Unix epoch back into a timestamp
///
/// Returns `None` for values chrono cannot represent.
pub fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

/// True if `at` lies in `[now - window, now]`
///
/// Timestamps after `now` (skewed or forward-set clocks) are never recent.
pub fn is_within(at: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    if at > now {
        return false;
    }
    match chrono::Duration::from_std(window) {
        Ok(window) => now.signed_duration_since(at) <= window,
        // Window too large to represent: every past timestamp is recent
        Err(_) => true,
    }
}
