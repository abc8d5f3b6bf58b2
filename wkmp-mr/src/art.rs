//! Cover-art URL resolution
//!
//! Art identifiers come in four shapes. Classification happens before any
//! network access:
//!
//! | Shape                  | Result                                   |
//! |------------------------|------------------------------------------|
//! | absolute URL           | unchanged                                |
//! | dashed-hex UUID        | external CDN path, no mirror involved    |
//! | proxy-relative path    | best mirror base + path                  |
//! | anything else (opaque) | `{best mirror}/image/?id={id}`           |
//!
//! [`ArtResolver::resolve_verified`] additionally probes mirrors before
//! committing, with a slow inter-attempt delay to stay under image endpoint
//! rate limits.

use crate::failover::{AttemptError, FailoverExecutor, FailoverPolicy};
use crate::mirror::{endpoint, MirrorHttp};
use crate::reliability::ReliabilityStore;
use crate::resource::ResolvedResource;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// External image CDN serving UUID-addressed artwork
pub const ART_CDN_BASE: &str = "https://resources.tidal.com/images";

const IMAGE_PATH: &str = "/image/";

static UUID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("UUID pattern is valid")
});

/// Classified art identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtId<'a> {
    Absolute(&'a str),
    CdnUuid(&'a str),
    ProxyPath(&'a str),
    Opaque(&'a str),
}

/// Classify a (trimmed) art identifier
pub fn classify(id: &str) -> ArtId<'_> {
    if has_http_scheme(id) {
        ArtId::Absolute(id)
    } else if UUID_PATTERN.is_match(id) {
        ArtId::CdnUuid(id)
    } else if id.starts_with('/') || id.starts_with("image/") {
        ArtId::ProxyPath(id)
    } else {
        ArtId::Opaque(id)
    }
}

/// Case-insensitive `http://` / `https://` prefix test
///
/// A matching ASCII prefix always ends on a char boundary, so `get` only
/// returns `None` for ids that cannot match.
fn has_http_scheme(id: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        id.get(..scheme.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(scheme))
    })
}

/// CDN size suffix
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtSize {
    Thumbnail,
    Small,
    Medium,
    #[default]
    Large,
}

impl ArtSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtSize::Thumbnail => "160x160",
            ArtSize::Small => "320x320",
            ArtSize::Medium => "640x640",
            ArtSize::Large => "1280x1280",
        }
    }
}

/// CDN URL for a dashed UUID: dashes become path separators
pub fn cdn_url(uuid: &str, size: ArtSize) -> String {
    format!(
        "{}/{}/{}.jpg",
        ART_CDN_BASE,
        uuid.to_ascii_lowercase().replace('-', "/"),
        size.as_str()
    )
}

/// Mirror-served URL for a proxy path or opaque id
///
/// Absolute and UUID identifiers never go through a mirror.
pub fn mirror_art_url(mirror: &str, id: ArtId<'_>) -> Result<String, AttemptError> {
    let base = mirror.trim_end_matches('/');
    match id {
        ArtId::ProxyPath(path) if path.starts_with('/') => Ok(format!("{}{}", base, path)),
        ArtId::ProxyPath(path) => Ok(format!("{}/{}", base, path)),
        ArtId::Opaque(raw) => Ok(endpoint(base, IMAGE_PATH, &[("id", raw)])?.to_string()),
        ArtId::Absolute(_) | ArtId::CdnUuid(_) => Err(AttemptError::Invalid(
            "identifier does not route through a mirror".to_string(),
        )),
    }
}

#[derive(Clone)]
pub struct ArtResolver {
    store: Arc<ReliabilityStore>,
    http: MirrorHttp,
    executor: FailoverExecutor,
    policy: FailoverPolicy,
    size: ArtSize,
}

impl ArtResolver {
    pub fn new(http: MirrorHttp, executor: FailoverExecutor, policy: FailoverPolicy) -> Self {
        Self {
            store: Arc::clone(executor.store()),
            http,
            executor,
            policy,
            size: ArtSize::default(),
        }
    }

    pub fn with_size(mut self, size: ArtSize) -> Self {
        self.size = size;
        self
    }

    /// Resolve by classification only, no network access
    ///
    /// Mirror-routed identifiers use the current best-ranked mirror.
    pub async fn resolve(&self, id: &str) -> ResolvedResource {
        let id = id.trim();
        if id.is_empty() {
            return ResolvedResource::Unresolved;
        }

        let class = classify(id);
        if let Some(direct) = self.direct(class) {
            return direct;
        }

        let Some(mirror) = self.store.best_mirror().await else {
            debug!("No mirrors configured for art resolution");
            return ResolvedResource::Unresolved;
        };

        match mirror_art_url(&mirror, class) {
            Ok(url) => ResolvedResource::via_mirror(url, mirror),
            Err(err) => {
                debug!(mirror = %mirror, error = %err, "Could not build art URL");
                ResolvedResource::Unresolved
            }
        }
    }

    /// Resolve, probing mirror-routed identifiers across ranked mirrors
    pub async fn resolve_verified(&self, id: &str, cancel: &CancellationToken) -> ResolvedResource {
        let id = id.trim();
        if id.is_empty() {
            return ResolvedResource::Unresolved;
        }

        let class = classify(id);
        if let Some(direct) = self.direct(class) {
            return direct;
        }

        self.executor
            .execute_validated(
                "art",
                self.policy,
                cancel,
                |mirror| async move { self.probe(&mirror, class).await },
                |(_, status): &(String, StatusCode)| {
                    if status.is_success() {
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

    fn direct(&self, class: ArtId<'_>) -> Option<ResolvedResource> {
        match class {
            ArtId::Absolute(url) => Some(ResolvedResource::direct(url)),
            ArtId::CdnUuid(uuid) => Some(ResolvedResource::direct(cdn_url(uuid, self.size))),
            ArtId::ProxyPath(_) | ArtId::Opaque(_) => None,
        }
    }

    async fn probe(&self, mirror: &str, class: ArtId<'_>) -> Result<(String, StatusCode), AttemptError> {
        let url = mirror_art_url(mirror, class)?;
        let parsed = reqwest::Url::parse(&url)
            .map_err(|e| AttemptError::Invalid(format!("bad art URL {}: {}", url, e)))?;
        let status = self.http.probe_head(parsed).await?;
        Ok((url, status))
    }
}
