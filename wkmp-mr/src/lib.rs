//! wkmp-mr - Mirror Router
//!
//! Routes catalog search, stream discovery and cover-art lookups across an
//! interchangeable pool of mirror backends. Mirror health is tracked in a
//! persistent [`reliability::ReliabilityStore`]; every request goes through the
//! healthiest mirror first and fails over through the rest.
//!
//! Build one [`MirrorRouter`] at startup and share clones of it (or of its
//! clients) with every task that needs a resolution.

pub mod art;
pub mod config;
pub mod error;
pub mod failover;
pub mod mirror;
pub mod ranking;
pub mod reliability;
pub mod resource;
pub mod search;
pub mod stream;

pub use crate::error::{Result, RouterError};
pub use crate::resource::ResolvedResource;

use crate::art::ArtResolver;
use crate::config::RouterConfig;
use crate::failover::FailoverExecutor;
use crate::mirror::MirrorHttp;
use crate::reliability::ReliabilityStore;
use crate::search::CatalogSearch;
use crate::stream::StreamResolver;
use std::sync::Arc;
use tracing::info;
use wkmp_common::settings::SettingsStore;

/// Reliability store plus the three resolution clients sharing it
#[derive(Clone)]
pub struct MirrorRouter {
    store: Arc<ReliabilityStore>,
    search: CatalogSearch,
    streams: StreamResolver,
    art: ArtResolver,
}

impl MirrorRouter {
    /// Build the router and load persisted reliability counters
    ///
    /// `config` must already be validated.
    pub async fn open(config: &RouterConfig, settings: Arc<dyn SettingsStore>) -> Result<Self> {
        let store = Arc::new(ReliabilityStore::new(config.mirrors.clone(), settings));
        store.load().await;

        let router = Self::with_store(config, store)?;
        info!(mirrors = config.mirrors.len(), "Mirror router ready");
        Ok(router)
    }

    /// Build the router around an existing store (no load performed)
    pub fn with_store(config: &RouterConfig, store: Arc<ReliabilityStore>) -> Result<Self> {
        let identity = config.identity();
        let timeouts = config.timeouts;

        let search_http = MirrorHttp::new(&identity, timeouts.search_connect(), timeouts.search_request())?;
        let probe_http = MirrorHttp::new(&identity, timeouts.probe(), timeouts.probe())?;
        let executor = FailoverExecutor::new(Arc::clone(&store));

        Ok(Self {
            search: CatalogSearch::new(search_http, executor.clone(), timeouts.search_policy()),
            streams: StreamResolver::new(probe_http.clone(), executor.clone(), timeouts.stream_policy()),
            art: ArtResolver::new(probe_http, executor, timeouts.art_policy()).with_size(config.art_size),
            store,
        })
    }

    pub fn store(&self) -> &Arc<ReliabilityStore> {
        &self.store
    }

    pub fn search(&self) -> &CatalogSearch {
        &self.search
    }

    pub fn streams(&self) -> &StreamResolver {
        &self.streams
    }

    pub fn art(&self) -> &ArtResolver {
        &self.art
    }
}
