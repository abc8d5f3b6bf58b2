//! Mirror reliability store
//!
//! Tracks per-mirror success/failure counters and the time of the last
//! success. Counters live in memory behind a lock so many tasks can record
//! outcomes concurrently; after every mutation the full record set is written
//! to the settings store as one versioned JSON blob.
//!
//! A success resets the failure counter to zero. Combined with the recency
//! bonus in [`crate::ranking`], a mirror that just recovered moves to the front
//! of the ranked list immediately.
//!
//! Persistence is best-effort: failures are logged and never propagated to the
//! caller that reported an outcome.

use crate::ranking;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell, RwLock};
use tracing::{debug, info, warn};
use wkmp_common::settings::SettingsStore;
use wkmp_common::time;

/// Settings key holding the serialized reliability blob
pub const RELIABILITY_SETTINGS_KEY: &str = "mirror_reliability";

/// Current blob format version
pub const BLOB_VERSION: u32 = 1;

/// Counters for one mirror
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReliabilityRecord {
    pub success_count: u64,
    pub failure_count: u64,
    pub last_success_at: Option<DateTime<Utc>>,
}

/// One row of [`ReliabilityStore::snapshot`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorStatus {
    pub mirror: String,
    pub record: ReliabilityRecord,
    pub score: i64,
}

/// Persisted form: three maps keyed by mirror identity
#[derive(Debug, Default, Serialize, Deserialize)]
struct ReliabilityBlob {
    version: u32,
    #[serde(default)]
    successes: BTreeMap<String, u64>,
    #[serde(default)]
    failures: BTreeMap<String, u64>,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    last_success: BTreeMap<String, i64>,
}

impl ReliabilityBlob {
    fn from_records(records: &HashMap<String, ReliabilityRecord>) -> Self {
        let mut blob = Self {
            version: BLOB_VERSION,
            ..Self::default()
        };

        for (mirror, record) in records {
            blob.successes.insert(mirror.clone(), record.success_count);
            blob.failures.insert(mirror.clone(), record.failure_count);
            if let Some(at) = record.last_success_at {
                blob.last_success.insert(mirror.clone(), time::to_epoch_millis(at));
            }
        }

        blob
    }

    fn into_records(self) -> HashMap<String, ReliabilityRecord> {
        let mut records: HashMap<String, ReliabilityRecord> = HashMap::new();

        for (mirror, count) in self.successes {
            records.entry(mirror).or_default().success_count = count;
        }
        for (mirror, count) in self.failures {
            records.entry(mirror).or_default().failure_count = count;
        }
        for (mirror, millis) in self.last_success {
            match time::from_epoch_millis(millis) {
                Some(at) => records.entry(mirror).or_default().last_success_at = Some(at),
                None => warn!(mirror = %mirror, millis, "Dropping unrepresentable last-success time"),
            }
        }

        records
    }
}

/// Reliability counters for a configured set of mirrors
pub struct ReliabilityStore {
    /// Configured mirror order (tie-breaker for ranking)
    mirrors: Vec<String>,
    records: RwLock<HashMap<String, ReliabilityRecord>>,
    backend: Arc<dyn SettingsStore>,
    loaded: OnceCell<()>,
    /// Serializes blob writes; the snapshot is taken while holding it
    persist_lock: Mutex<()>,
}

impl ReliabilityStore {
    pub fn new(mirrors: Vec<String>, backend: Arc<dyn SettingsStore>) -> Self {
        Self {
            mirrors,
            records: RwLock::new(HashMap::new()),
            backend,
            loaded: OnceCell::new(),
            persist_lock: Mutex::new(()),
        }
    }

    /// Configured mirrors in configuration order
    pub fn mirrors(&self) -> &[String] {
        &self.mirrors
    }

    /// Load persisted counters once per process
    ///
    /// Subsequent calls are no-ops. A missing, corrupt or foreign-version
    /// blob leaves the store empty. Outcomes recorded before the load keep
    /// their in-memory values.
    pub async fn load(&self) {
        self.loaded
            .get_or_init(|| async {
                let persisted = self.read_blob().await;
                let count = persisted.len();

                let mut records = self.records.write().await;
                for (mirror, record) in persisted {
                    records.entry(mirror).or_insert(record);
                }

                info!(mirrors = count, "Mirror reliability loaded");
            })
            .await;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    async fn read_blob(&self) -> HashMap<String, ReliabilityRecord> {
        let raw = match self.backend.get(RELIABILITY_SETTINGS_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return HashMap::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read mirror reliability; starting empty");
                return HashMap::new();
            }
        };

        match serde_json::from_str::<ReliabilityBlob>(&raw) {
            Ok(blob) if blob.version == BLOB_VERSION => blob.into_records(),
            Ok(blob) => {
                warn!(
                    version = blob.version,
                    expected = BLOB_VERSION,
                    "Unsupported mirror reliability version; starting empty"
                );
                HashMap::new()
            }
            Err(e) => {
                warn!(error = %e, "Corrupt mirror reliability blob; starting empty");
                HashMap::new()
            }
        }
    }

    /// Write the full record set to the settings store
    pub async fn persist(&self) -> wkmp_common::Result<()> {
        let _guard = self.persist_lock.lock().await;

        let blob = {
            let records = self.records.read().await;
            ReliabilityBlob::from_records(&records)
        };
        let json = serde_json::to_string(&blob)?;

        self.backend.set(RELIABILITY_SETTINGS_KEY, &json).await
    }

    async fn persist_best_effort(&self) {
        if let Err(e) = self.persist().await {
            warn!(error = %e, "Failed to persist mirror reliability");
        }
    }

    /// Record a validated success for `mirror`
    pub async fn record_success(&self, mirror: &str) {
        self.record_success_at(mirror, time::now()).await;
    }

    /// Record a success observed at `at`
    pub async fn record_success_at(&self, mirror: &str, at: DateTime<Utc>) {
        {
            let mut records = self.records.write().await;
            let record = records.entry(mirror.to_string()).or_default();
            record.success_count = record.success_count.saturating_add(1);
            record.failure_count = 0;
            record.last_success_at = Some(at);
            debug!(mirror = %mirror, successes = record.success_count, "Mirror success recorded");
        }

        self.persist_best_effort().await;
    }

    /// Record a failed or invalid attempt against `mirror`
    pub async fn record_failure(&self, mirror: &str) {
        {
            let mut records = self.records.write().await;
            let record = records.entry(mirror.to_string()).or_default();
            record.failure_count = record.failure_count.saturating_add(1);
            debug!(mirror = %mirror, failures = record.failure_count, "Mirror failure recorded");
        }

        self.persist_best_effort().await;
    }

    /// Counters for `mirror` (all-zero if never seen)
    pub async fn record(&self, mirror: &str) -> ReliabilityRecord {
        self.records
            .read()
            .await
            .get(mirror)
            .copied()
            .unwrap_or_default()
    }

    /// Configured mirrors, most reliable first
    pub async fn ranked_mirrors(&self) -> Vec<String> {
        self.ranked_mirrors_at(time::now()).await
    }

    /// Ranking as of `now`
    pub async fn ranked_mirrors_at(&self, now: DateTime<Utc>) -> Vec<String> {
        let records = self.records.read().await;
        ranking::rank(&self.mirrors, &records, now)
    }

    /// Most reliable mirror, if any are configured
    pub async fn best_mirror(&self) -> Option<String> {
        self.ranked_mirrors().await.into_iter().next()
    }

    /// Per-mirror counters and scores in ranked order
    pub async fn snapshot(&self) -> Vec<MirrorStatus> {
        let now = time::now();
        let records = self.records.read().await;

        ranking::rank_with_scores(&self.mirrors, &records, now)
            .into_iter()
            .map(|(mirror, score)| {
                let record = records.get(&mirror).copied().unwrap_or_default();
                MirrorStatus {
                    mirror,
                    record,
                    score,
                }
            })
            .collect()
    }

    /// Forget all history (operator action)
    pub async fn reset(&self) -> wkmp_common::Result<()> {
        self.records.write().await.clear();
        info!("Mirror reliability reset");
        self.persist().await
    }
}
