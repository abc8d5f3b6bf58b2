//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Primary environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "WKMP_ROOT_FOLDER";

/// Alternative (shorter) root folder environment variable
pub const ROOT_FOLDER_ENV_ALT: &str = "WKMP_ROOT";

/// Shared database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "wkmp.db";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Root folder resolution in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable (`WKMP_ROOT_FOLDER`, then `WKMP_ROOT`)
/// 3. TOML config file `root_folder`
/// 4. OS-dependent compiled default (fallback)
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            cli_arg: None,
            toml_root: None,
        }
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml_root(mut self, path: Option<PathBuf>) -> Self {
        self.toml_root = path;
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            debug!(module = %self.module_name, "Root folder from command line");
            return path.clone();
        }

        for var in [ROOT_FOLDER_ENV, ROOT_FOLDER_ENV_ALT] {
            if let Ok(path) = std::env::var(var) {
                if !path.trim().is_empty() {
                    debug!(module = %self.module_name, var, "Root folder from environment");
                    return PathBuf::from(path);
                }
            }
        }

        if let Some(path) = &self.toml_root {
            debug!(module = %self.module_name, "Root folder from TOML config");
            return path.clone();
        }

        default_root_folder()
    }
}

/// Path of the shared database inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE_NAME)
}

/// Default per-module TOML config path, e.g. `~/.config/wkmp/wkmp-mr.toml`
pub fn module_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wkmp").join(format!("{}.toml", module_name)))
}

/// Load a TOML config file
///
/// A missing file is not an error: the caller gets `Ok(None)` and falls back
/// to defaults. Unreadable or unparsable files are errors.
pub fn load_toml_config<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        warn!("Config file not found: {}, using defaults", path.display());
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    Ok(Some(config))
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/wkmp (or /var/lib/wkmp for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("wkmp"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/wkmp"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/wkmp
        dirs::data_dir()
            .map(|d| d.join("wkmp"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/wkmp"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\wkmp
        dirs::data_local_dir()
            .map(|d| d.join("wkmp"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\wkmp"))
    } else {
        PathBuf::from("./wkmp_data")
    }
}
