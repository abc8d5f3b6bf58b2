//! Stream URL resolution
//!
//! Before playback, the track is probed on mirrors in ranked order
//! (`/track/?id=`); the stream URL is then built against the first mirror
//! that answered 200, so the chosen mirror is known-good for this track now.

use crate::failover::{AttemptError, FailoverExecutor, FailoverPolicy};
use crate::mirror::{endpoint, MirrorHttp};
use crate::resource::ResolvedResource;
use reqwest::{StatusCode, Url};
use tokio_util::sync::CancellationToken;
use tracing::debug;

const TRACK_PATH: &str = "/track/";
const STREAM_PATH: &str = "/stream/";

/// Playable stream URL for `track_id` on `mirror`
pub fn stream_url(mirror: &str, track_id: &str) -> Result<Url, AttemptError> {
    endpoint(mirror, STREAM_PATH, &[("id", track_id)])
}

/// Probe URL for `track_id` on `mirror`
pub fn probe_url(mirror: &str, track_id: &str) -> Result<Url, AttemptError> {
    endpoint(mirror, TRACK_PATH, &[("id", track_id)])
}

#[derive(Clone)]
pub struct StreamResolver {
    http: MirrorHttp,
    executor: FailoverExecutor,
    policy: FailoverPolicy,
}

impl StreamResolver {
    pub fn new(http: MirrorHttp, executor: FailoverExecutor, policy: FailoverPolicy) -> Self {
        Self {
            http,
            executor,
            policy,
        }
    }

    pub async fn resolve(&self, track_id: &str, cancel: &CancellationToken) -> ResolvedResource {
        let track_id = track_id.trim();
        if track_id.is_empty() {
            debug!("Blank track id, nothing to resolve");
            return ResolvedResource::Unresolved;
        }

        self.executor
            .execute_validated(
                "stream",
                self.policy,
                cancel,
                |mirror| async move { self.probe(&mirror, track_id).await },
                |(_, status): &(String, StatusCode)| {
                    if *status == StatusCode::OK {
                        Ok(())
                    } else {
                        Err(AttemptError::Status(status.as_u16()))
                    }
                },
            )
            .await
            .map_value(|(url, _)| url)
            .into()
    }

    /// Probe one mirror; returns the stream URL it would serve and the probe status
    async fn probe(&self, mirror: &str, track_id: &str) -> Result<(String, StatusCode), AttemptError> {
        let status = self.http.probe_get(probe_url(mirror, track_id)?).await?;
        let url = stream_url(mirror, track_id)?;
        Ok((url.to_string(), status))
    }
}
