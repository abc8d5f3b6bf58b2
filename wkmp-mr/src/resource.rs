//! Outcome of single-resource resolution (stream or cover-art URL)

use crate::failover::FailoverOutcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedResource {
    /// Concrete URL; `mirror` is `None` when no mirror was involved
    Resolved { url: String, mirror: Option<String> },
    /// No mirror could serve the resource (or the identifier was unusable)
    Unresolved,
    /// Caller cancelled before resolution finished
    Cancelled,
}

impl ResolvedResource {
    pub fn direct(url: impl Into<String>) -> Self {
        ResolvedResource::Resolved {
            url: url.into(),
            mirror: None,
        }
    }

    pub fn via_mirror(url: impl Into<String>, mirror: impl Into<String>) -> Self {
        ResolvedResource::Resolved {
            url: url.into(),
            mirror: Some(mirror.into()),
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            ResolvedResource::Resolved { url, .. } => Some(url),
            _ => None,
        }
    }

    pub fn mirror(&self) -> Option<&str> {
        match self {
            ResolvedResource::Resolved { mirror, .. } => mirror.as_deref(),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolvedResource::Resolved { .. })
    }
}

impl From<FailoverOutcome<String>> for ResolvedResource {
    /// Resolved value is the URL served by the winning mirror
    fn from(outcome: FailoverOutcome<String>) -> Self {
        match outcome {
            FailoverOutcome::Resolved { mirror, value } => ResolvedResource::via_mirror(value, mirror),
            FailoverOutcome::Exhausted { .. } => ResolvedResource::Unresolved,
            FailoverOutcome::Cancelled => ResolvedResource::Cancelled,
        }
    }
}
