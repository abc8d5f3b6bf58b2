//! Catalog search across mirrors
//!
//! Each mirror receives three sub-queries: tracks (`/search/?s=`), albums
//! (`?al=`) and artists (`?a=`). The track query decides whether the mirror
//! answered at all; album and artist queries only fill their categories when
//! they succeed.

pub mod aggregate;
pub mod model;

pub use aggregate::SearchAggregate;
pub use model::{Album, Artist, QualityTag, SearchPage, Track};

use crate::failover::{AttemptError, FailoverExecutor, FailoverOutcome, FailoverPolicy};
use crate::mirror::{endpoint, MirrorHttp};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const SEARCH_PATH: &str = "/search/";
const TRACK_PARAM: &str = "s";
const ALBUM_PARAM: &str = "al";
const ARTIST_PARAM: &str = "a";

/// How a search ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    /// A mirror answered and something matched
    OkWithResults,
    /// A mirror answered validly but nothing matched (or the query was blank)
    OkEmpty,
    /// No mirror could be reached or produced a valid answer
    AllMirrorsFailed,
    /// Caller cancelled the search
    Cancelled,
}

/// Search results plus the status the UI needs to pick its message
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub status: SearchStatus,
    pub aggregate: SearchAggregate,
    /// Mirror that served the results
    pub mirror: Option<String>,
}

/// Catalog search client
#[derive(Clone)]
pub struct CatalogSearch {
    http: MirrorHttp,
    executor: FailoverExecutor,
    policy: FailoverPolicy,
}

impl CatalogSearch {
    pub fn new(http: MirrorHttp, executor: FailoverExecutor, policy: FailoverPolicy) -> Self {
        Self {
            http,
            executor,
            policy,
        }
    }

    /// Search with a fresh aggregate
    pub async fn search(&self, query: &str, cancel: &CancellationToken) -> SearchOutcome {
        self.search_into(query, SearchAggregate::new(), cancel).await
    }

    /// Search, merging results into an existing aggregate
    ///
    /// Albums and artists already present are kept; duplicates from this
    /// run are dropped.
    pub async fn search_into(
        &self,
        query: &str,
        mut aggregate: SearchAggregate,
        cancel: &CancellationToken,
    ) -> SearchOutcome {
        let query = query.trim();
        if query.is_empty() {
            debug!("Blank search query, skipping mirrors");
            return SearchOutcome {
                status: SearchStatus::OkEmpty,
                aggregate,
                mirror: None,
            };
        }

        let outcome = self
            .executor
            .execute("search", self.policy, cancel, |mirror| async move {
                self.query_mirror(&mirror, query).await
            })
            .await;

        match outcome {
            FailoverOutcome::Resolved { mirror, value } => {
                info!(
                    mirror = %mirror,
                    tracks = value.tracks.len(),
                    albums = value.albums.len(),
                    artists = value.artists.len(),
                    "Search answered"
                );
                aggregate.absorb(value);
                let status = if aggregate.is_empty() {
                    SearchStatus::OkEmpty
                } else {
                    SearchStatus::OkWithResults
                };
                SearchOutcome {
                    status,
                    aggregate,
                    mirror: Some(mirror),
                }
            }
            FailoverOutcome::Exhausted { .. } => SearchOutcome {
                status: SearchStatus::AllMirrorsFailed,
                aggregate,
                mirror: None,
            },
            FailoverOutcome::Cancelled => SearchOutcome {
                status: SearchStatus::Cancelled,
                aggregate,
                mirror: None,
            },
        }
    }

    /// All three sub-queries against one mirror
    async fn query_mirror(&self, mirror: &str, query: &str) -> Result<SearchPage, AttemptError> {
        let url = endpoint(mirror, SEARCH_PATH, &[(TRACK_PARAM, query)])?;
        let body = self.http.get_json_text(url).await?;
        let tracks = model::parse_tracks(&body)?;

        let (albums, artists) = tokio::join!(
            self.best_effort(mirror, ALBUM_PARAM, query, model::parse_albums),
            self.best_effort(mirror, ARTIST_PARAM, query, model::parse_artists),
        );

        Ok(SearchPage {
            tracks,
            albums,
            artists,
        })
    }

    /// Sub-query whose failure only empties its own category
    async fn best_effort<T>(
        &self,
        mirror: &str,
        param: &str,
        query: &str,
        parse: fn(&str) -> Result<Vec<T>, AttemptError>,
    ) -> Vec<T> {
        self.fetch_category(mirror, param, query, parse)
            .await
            .unwrap_or_else(|err| {
                debug!(mirror = %mirror, param, error = %err, "Optional search category failed");
                Vec::new()
            })
    }

    async fn fetch_category<T>(
        &self,
        mirror: &str,
        param: &str,
        query: &str,
        parse: fn(&str) -> Result<Vec<T>, AttemptError>,
    ) -> Result<Vec<T>, AttemptError> {
        let url = endpoint(mirror, SEARCH_PATH, &[(param, query)])?;
        let body = self.http.get_json_text(url).await?;
        parse(&body)
    }
}
