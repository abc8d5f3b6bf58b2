//! Mirror identity and HTTP access
//!
//! A mirror is identified by its normalized base URL. [`MirrorHttp`] wraps a
//! `reqwest::Client` carrying the identification headers every mirror gates
//! on, and classifies responses into [`AttemptError`]s for the failover loop.

use crate::error::{Result, RouterError};
use crate::failover::AttemptError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{StatusCode, Url};
use std::time::Duration;

/// Client identification header sent with every request
pub const CLIENT_ID_HEADER: &str = "x-client";

/// Default value of [`CLIENT_ID_HEADER`]
pub const DEFAULT_CLIENT_ID: &str = "WKMP/0.1.0";

/// Browser-like user agent; some mirrors reject library defaults
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/126.0.0.0 Mobile Safari/537.36";

/// Normalize a configured mirror base URL
///
/// Trims whitespace and trailing slashes; requires an absolute http(s) URL.
pub fn normalize_mirror_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');

    let url = Url::parse(trimmed).map_err(|_| RouterError::InvalidMirror(raw.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(RouterError::InvalidMirror(raw.to_string()));
    }

    Ok(trimmed.to_string())
}

/// Build `{mirror}{path}?{params}` with query values percent-encoded
pub fn endpoint(
    mirror: &str,
    path: &str,
    params: &[(&str, &str)],
) -> std::result::Result<Url, AttemptError> {
    let base = mirror.trim_end_matches('/');
    let mut url = Url::parse(&format!("{}{}", base, path))
        .map_err(|e| AttemptError::Invalid(format!("bad URL for {}: {}", mirror, e)))?;

    if !params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }

    Ok(url)
}

/// True if a response body looks like a JSON document
///
/// Captive portals, HTML error pages and truncated proxy responses fail this
/// even when served with status 200.
pub fn looks_like_json(body: &str) -> bool {
    let trimmed = body.trim_start();
    trimmed.starts_with('{') || trimmed.starts_with('[')
}

/// Identification sent to mirrors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub client_id: String,
    pub user_agent: String,
}

impl Default for ClientIdentity {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// HTTP client for mirror requests
#[derive(Debug, Clone)]
pub struct MirrorHttp {
    client: reqwest::Client,
}

impl MirrorHttp {
    pub fn new(
        identity: &ClientIdentity,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let client_id = HeaderValue::from_str(&identity.client_id)
            .map_err(|e| RouterError::Config(format!("Invalid client id: {}", e)))?;
        headers.insert(HeaderName::from_static(CLIENT_ID_HEADER), client_id);

        let client = reqwest::Client::builder()
            .user_agent(identity.user_agent.as_str())
            .default_headers(headers)
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;

        Ok(Self { client })
    }

    /// GET a JSON document
    ///
    /// Fails unless the status is 2xx, the body is non-empty and the body
    /// starts with an object/array delimiter.
    pub async fn get_json_text(&self, url: Url) -> std::result::Result<String, AttemptError> {
        tracing::debug!(url = %url, "GET");

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(AttemptError::Invalid("empty body".to_string()));
        }
        if !looks_like_json(&body) {
            return Err(AttemptError::Invalid("body is not JSON".to_string()));
        }

        Ok(body)
    }

    /// GET returning only the status; the body is never read
    pub async fn probe_get(&self, url: Url) -> std::result::Result<StatusCode, AttemptError> {
        tracing::debug!(url = %url, "Probe GET");
        let response = self.client.get(url).send().await?;
        Ok(response.status())
    }

    /// HEAD returning the status
    pub async fn probe_head(&self, url: Url) -> std::result::Result<StatusCode, AttemptError> {
        tracing::debug!(url = %url, "Probe HEAD");
        let response = self.client.head(url).send().await?;
        Ok(response.status())
    }
}
