//! Error types for wkmp-mr
//!
//! Only construction and configuration can fail with [`RouterError`].
//! Resolution calls report ordinary mirror failures through typed outcomes
//! instead (see [`crate::failover::FailoverOutcome`]).

use thiserror::Error;

/// Router construction / configuration error
#[derive(Debug, Error)]
pub enum RouterError {
    /// Mirror list empty after normalization
    #[error("No mirrors configured")]
    NoMirrors,

    /// Mirror base URL is not an absolute http(s) URL
    #[error("Invalid mirror URL: {0}")]
    InvalidMirror(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// wkmp-common error
    #[error("Common error: {0}")]
    Common(#[from] wkmp_common::Error),
}

/// Result type for router construction
pub type Result<T> = std::result::Result<T, RouterError>;
