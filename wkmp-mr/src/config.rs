//! Configuration for wkmp-mr
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments (`--mirror`, `--root-folder`, `--config`)
//! 2. Environment variables (`WKMP_MR_MIRRORS`, `WKMP_ROOT_FOLDER`)
//! 3. TOML file (`~/.config/wkmp/wkmp-mr.toml` by default)
//! 4. Built-in defaults
//!
//! A missing TOML file is not fatal; defaults are used and a warning logged.

use crate::art::ArtSize;
use crate::error::{Result, RouterError};
use crate::failover::FailoverPolicy;
use crate::mirror::{normalize_mirror_url, ClientIdentity, DEFAULT_CLIENT_ID, DEFAULT_USER_AGENT};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use wkmp_common::config::{load_toml_config, module_config_path, LoggingConfig};

/// Module name used for config file lookup and logging
pub const MODULE_NAME: &str = "wkmp-mr";

/// Comma-separated mirror list override
pub const MIRRORS_ENV: &str = "WKMP_MR_MIRRORS";

/// Router configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    /// Mirror base URLs in configured (tie-break) order
    #[serde(default)]
    pub mirrors: Vec<String>,

    /// Root folder holding the shared database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Value of the client identification header
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Browser-like user agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// CDN cover-art size (`thumbnail`, `small`, `medium`, `large`)
    #[serde(default)]
    pub art_size: ArtSize,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// Network timing, all values in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub search_connect_ms: u64,
    pub search_request_ms: u64,
    /// Budget for all three sub-queries against one mirror
    pub search_attempt_ms: u64,
    pub search_delay_ms: u64,
    /// Connect and request timeout of stream and art probes
    pub probe_ms: u64,
    pub stream_delay_ms: u64,
    pub art_delay_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            search_connect_ms: 15_000,
            search_request_ms: 20_000,
            search_attempt_ms: 45_000,
            search_delay_ms: 500,
            probe_ms: 3_000,
            stream_delay_ms: 500,
            art_delay_ms: 2_000,
        }
    }
}

impl TimeoutConfig {
    pub fn search_connect(&self) -> Duration {
        Duration::from_millis(self.search_connect_ms)
    }

    pub fn search_request(&self) -> Duration {
        Duration::from_millis(self.search_request_ms)
    }

    pub fn probe(&self) -> Duration {
        Duration::from_millis(self.probe_ms)
    }

    pub fn search_policy(&self) -> FailoverPolicy {
        FailoverPolicy::new(
            Duration::from_millis(self.search_attempt_ms),
            Duration::from_millis(self.search_delay_ms),
        )
    }

    pub fn stream_policy(&self) -> FailoverPolicy {
        FailoverPolicy::new(self.probe(), Duration::from_millis(self.stream_delay_ms))
    }

    pub fn art_policy(&self) -> FailoverPolicy {
        FailoverPolicy::new(self.probe(), Duration::from_millis(self.art_delay_ms))
    }

    fn validate(&self) -> Result<()> {
        let budgets = [
            ("search_connect_ms", self.search_connect_ms),
            ("search_request_ms", self.search_request_ms),
            ("search_attempt_ms", self.search_attempt_ms),
            ("probe_ms", self.probe_ms),
        ];
        for (name, value) in budgets {
            if value == 0 {
                return Err(RouterError::Config(format!("{} must be greater than zero", name)));
            }
        }
        Ok(())
    }
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            mirrors: Vec::new(),
            root_folder: None,
            client_id: default_client_id(),
            user_agent: default_user_agent(),
            art_size: ArtSize::default(),
            logging: LoggingConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl RouterConfig {
    /// Programmatic configuration with default timing
    pub fn with_mirrors<I, S>(mirrors: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mirrors: mirrors.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
        .validated()
    }

    /// Load TOML (explicit path or module default) and apply env overrides
    ///
    /// The result is not yet validated; finish with [`RouterConfig::validated`]
    /// or [`RouterConfig::override_mirrors`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (config, source) = Self::load_with_source(path)?;
        source.log();
        Ok(config)
    }

    /// Same as [`RouterConfig::load`] but silent; the caller logs the source
    /// once its subscriber is installed
    pub fn load_with_source(path: Option<&Path>) -> Result<(Self, ConfigSource)> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => module_config_path(MODULE_NAME),
        };

        let mut source = ConfigSource::default();
        let mut config = match path {
            Some(p) if p.exists() => {
                let config = load_toml_config::<RouterConfig>(&p)?.unwrap_or_default();
                source.file = Some(p);
                config
            }
            Some(p) => {
                source.missing_file = Some(p);
                RouterConfig::default()
            }
            None => RouterConfig::default(),
        };

        if let Ok(raw) = std::env::var(MIRRORS_ENV) {
            let mirrors = parse_mirror_list(&raw);
            if !mirrors.is_empty() {
                source.env_mirrors = Some(mirrors.len());
                config.mirrors = mirrors;
            }
        }

        Ok((config, source))
    }

    /// Replace the mirror list (e.g. from `--mirror` arguments)
    pub fn override_mirrors(mut self, mirrors: Vec<String>) -> Result<Self> {
        if !mirrors.is_empty() {
            self.mirrors = mirrors;
        }
        self.validated()
    }

    /// Normalize and deduplicate mirrors (first occurrence wins) and check timing
    pub fn validated(mut self) -> Result<Self> {
        let mut normalized: Vec<String> = Vec::with_capacity(self.mirrors.len());
        for raw in &self.mirrors {
            let mirror = normalize_mirror_url(raw)?;
            if !normalized.contains(&mirror) {
                normalized.push(mirror);
            }
        }

        if normalized.is_empty() {
            return Err(RouterError::NoMirrors);
        }

        self.timeouts.validate()?;
        self.mirrors = normalized;
        Ok(self)
    }

    pub fn identity(&self) -> ClientIdentity {
        ClientIdentity {
            client_id: self.client_id.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Where a loaded configuration came from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSource {
    /// TOML file that was read
    pub file: Option<PathBuf>,
    /// TOML file looked for but not found
    pub missing_file: Option<PathBuf>,
    /// Number of mirrors taken from [`MIRRORS_ENV`]
    pub env_mirrors: Option<usize>,
}

impl ConfigSource {
    pub fn log(&self) {
        if let Some(path) = &self.file {
            info!("Config file: {}", path.display());
        }
        if let Some(path) = &self.missing_file {
            warn!("Config file not found: {}, using defaults", path.display());
        }
        if let Some(count) = self.env_mirrors {
            info!(count, "Mirror list from {}", MIRRORS_ENV);
        }
    }
}

/// Split a comma/whitespace separated mirror list
pub fn parse_mirror_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
