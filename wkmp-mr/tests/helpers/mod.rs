//! Test helpers for wkmp-mr integration tests
//!
//! - `mock_mirror`: wiremock-backed mirrors and canned payloads
//! - `router_for`: router over mock mirrors with fast timing and in-memory settings
//! - `FailingSettingsStore`: backend whose every write fails

#![allow(dead_code)]

pub mod mock_mirror;

pub use mock_mirror::{album_page, artist_page, track_page, MockMirror};

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wkmp_common::settings::{MemorySettingsStore, SettingsStore};
use wkmp_mr::config::{RouterConfig, TimeoutConfig};
use wkmp_mr::MirrorRouter;

/// Timing tight enough for tests; no inter-attempt delays
pub fn fast_timeouts() -> TimeoutConfig {
    TimeoutConfig {
        search_connect_ms: 1_000,
        search_request_ms: 1_000,
        search_attempt_ms: 2_000,
        search_delay_ms: 0,
        probe_ms: 1_000,
        stream_delay_ms: 0,
        art_delay_ms: 0,
    }
}

pub fn fast_config(mirrors: &[String]) -> RouterConfig {
    let config = RouterConfig::with_mirrors(mirrors.iter().cloned()).unwrap();
    RouterConfig {
        timeouts: fast_timeouts(),
        ..config
    }
}

/// Router over `mirrors` (in configured order) backed by `settings`
pub async fn router_with_settings(
    mirrors: &[&MockMirror],
    settings: Arc<dyn SettingsStore>,
) -> MirrorRouter {
    let uris: Vec<String> = mirrors.iter().map(|m| m.uri()).collect();
    MirrorRouter::open(&fast_config(&uris), settings).await.unwrap()
}

/// Router over `mirrors` with a fresh in-memory settings store
pub async fn router_for(mirrors: &[&MockMirror]) -> (MirrorRouter, Arc<MemorySettingsStore>) {
    let settings = Arc::new(MemorySettingsStore::new());
    let router = router_with_settings(mirrors, settings.clone()).await;
    (router, settings)
}

/// Settings backend that reads nothing and fails every write
#[derive(Debug, Default)]
pub struct FailingSettingsStore {
    writes: AtomicUsize,
}

impl FailingSettingsStore {
    pub fn write_attempts(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettingsStore for FailingSettingsStore {
    async fn get(&self, _key: &str) -> wkmp_common::Result<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str) -> wkmp_common::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(wkmp_common::Error::Internal("disk full".to_string()))
    }

    async fn remove(&self, _key: &str) -> wkmp_common::Result<()> {
        Err(wkmp_common::Error::Internal("disk full".to_string()))
    }
}
