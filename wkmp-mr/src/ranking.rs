//! Mirror ranking policy
//!
//! Pure functions turning reliability counters into a total order:
//!
//! ```text
//! score = successes * 10 - failures + (100 if last success within 5 minutes)
//! ```
//!
//! Mirrors are sorted by descending score. The sort is stable, so ties (and
//! every mirror of a fresh install with no history) keep configured order.

use crate::reliability::ReliabilityRecord;
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::time::Duration;

/// Weight of one recorded success
pub const SUCCESS_WEIGHT: i64 = 10;

/// Weight of one recorded failure (subtracted)
pub const FAILURE_WEIGHT: i64 = 1;

/// Bonus for a success inside [`RECENCY_WINDOW`]
pub const RECENCY_BONUS: i64 = 100;

/// How long a success keeps earning [`RECENCY_BONUS`]
pub const RECENCY_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Reliability score of one record at `now`
pub fn score(record: &ReliabilityRecord, now: DateTime<Utc>) -> i64 {
    let successes = i64::try_from(record.success_count).unwrap_or(i64::MAX);
    let failures = i64::try_from(record.failure_count).unwrap_or(i64::MAX);

    let recency = match record.last_success_at {
        Some(at) if wkmp_common::time::is_within(at, now, RECENCY_WINDOW) => RECENCY_BONUS,
        _ => 0,
    };

    successes
        .saturating_mul(SUCCESS_WEIGHT)
        .saturating_sub(failures.saturating_mul(FAILURE_WEIGHT))
        .saturating_add(recency)
}

/// Order `mirrors` by descending score
///
/// Mirrors absent from `records` score as all-zero.
pub fn rank(
    mirrors: &[String],
    records: &HashMap<String, ReliabilityRecord>,
    now: DateTime<Utc>,
) -> Vec<String> {
    rank_with_scores(mirrors, records, now)
        .into_iter()
        .map(|(mirror, _)| mirror)
        .collect()
}

/// Same as [`rank`] but keeps each mirror's score
pub fn rank_with_scores(
    mirrors: &[String],
    records: &HashMap<String, ReliabilityRecord>,
    now: DateTime<Utc>,
) -> Vec<(String, i64)> {
    let mut scored: Vec<(String, i64)> = mirrors
        .iter()
        .map(|mirror| {
            let record = records.get(mirror).copied().unwrap_or_default();
            (mirror.clone(), score(&record, now))
        })
        .collect();

    // sort_by_key is stable
    scored.sort_by_key(|(_, score)| Reverse(*score));
    scored
}
