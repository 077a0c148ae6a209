//! Configuration loading and resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const ENV_CONFIG_FILE: &str = "PHOTOENH_CONFIG";
pub const ENV_BASE_URL: &str = "PHOTOENH_BASE_URL";
pub const ENV_STATE_DIR: &str = "PHOTOENH_STATE_DIR";
pub const ENV_SESSION_COOKIE: &str = "PHOTOENH_SESSION_COOKIE";

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_PAGE_SIZE: u32 = 50;
/// The backend never returns more than this many photos per page
pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_DOWNLOAD_STAGGER_MS: u64 = 200;
pub const DEFAULT_PAID_DOWNLOAD_STAGGER_MS: u64 = 500;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Configuration file contents
///
/// Every field is optional; missing fields fall back to environment or defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Backend origin, e.g. `https://photos.example.com`
    #[serde(default)]
    pub base_url: Option<String>,

    /// Directory holding the persisted key-value store
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    /// Directory enhanced images are saved into
    #[serde(default)]
    pub download_dir: Option<PathBuf>,

    #[serde(default)]
    pub page_size: Option<u32>,

    #[serde(default)]
    pub download_stagger_ms: Option<u64>,

    #[serde(default)]
    pub paid_download_stagger_ms: Option<u64>,

    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Route uploads to night conversion instead of standard enhancement
    #[serde(default)]
    pub night_mode: Option<bool>,

    /// `Cookie` header value of an authenticated backend session
    #[serde(default)]
    pub session_cookie: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub base_url: Option<String>,
    pub state_dir: Option<PathBuf>,
    pub download_dir: Option<PathBuf>,
    pub night_mode: Option<bool>,
}

/// Fully resolved client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub state_dir: PathBuf,
    pub download_dir: PathBuf,
    pub page_size: u32,
    pub download_stagger_ms: u64,
    pub paid_download_stagger_ms: u64,
    pub request_timeout_secs: u64,
    pub night_mode: bool,
    pub session_cookie: Option<String>,
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            state_dir: default_state_dir(),
            download_dir: default_download_dir(),
            page_size: DEFAULT_PAGE_SIZE,
            download_stagger_ms: DEFAULT_DOWNLOAD_STAGGER_MS,
            paid_download_stagger_ms: DEFAULT_PAID_DOWNLOAD_STAGGER_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            night_mode: false,
            session_cookie: None,
            log_level: default_log_level(),
        }
    }
}

impl ClientConfig {
    /// Resolve configuration from command line, environment, config file and defaults
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self> {
        let toml_config = match config_file_path(overrides.config_file.as_deref()) {
            Some(path) => load_toml_config(&path)?.unwrap_or_default(),
            None => {
                warn!("Could not determine config directory, using defaults");
                TomlConfig::default()
            }
        };
        Ok(Self::merge(overrides, &toml_config))
    }

    /// Merge the configuration tiers
    ///
    /// Reads environment variables but touches no files.
    pub fn merge(overrides: &ConfigOverrides, toml_config: &TomlConfig) -> Self {
        let defaults = Self::default();

        let base_url = overrides
            .base_url
            .clone()
            .or_else(|| env_non_empty(ENV_BASE_URL))
            .or_else(|| toml_config.base_url.clone())
            .unwrap_or(defaults.base_url);

        let state_dir = overrides
            .state_dir
            .clone()
            .or_else(|| env_non_empty(ENV_STATE_DIR).map(PathBuf::from))
            .or_else(|| toml_config.state_dir.clone())
            .unwrap_or(defaults.state_dir);

        let download_dir = overrides
            .download_dir
            .clone()
            .or_else(|| toml_config.download_dir.clone())
            .unwrap_or(defaults.download_dir);

        let page_size = toml_config
            .page_size
            .unwrap_or(defaults.page_size)
            .clamp(1, MAX_PAGE_SIZE);

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            state_dir,
            download_dir,
            page_size,
            download_stagger_ms: toml_config
                .download_stagger_ms
                .unwrap_or(defaults.download_stagger_ms),
            paid_download_stagger_ms: toml_config
                .paid_download_stagger_ms
                .unwrap_or(defaults.paid_download_stagger_ms),
            request_timeout_secs: toml_config
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            night_mode: overrides
                .night_mode
                .or(toml_config.night_mode)
                .unwrap_or(defaults.night_mode),
            session_cookie: env_non_empty(ENV_SESSION_COOKIE)
                .or_else(|| toml_config.session_cookie.clone()),
            log_level: toml_config.logging.level.clone(),
        }
    }

    /// Path of the persisted key-value store file
    pub fn store_path(&self) -> PathBuf {
        self.state_dir.join("session.json")
    }
}

/// Locate the config file: explicit path, then `$PHOTOENH_CONFIG`, then the platform config dir
pub fn config_file_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env_non_empty(ENV_CONFIG_FILE) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join("photoenh").join("config.toml"))
}

/// Load a TOML config file
///
/// A missing file is not an error: returns `Ok(None)` and logs a warning.
/// A file that exists but cannot be parsed is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<Option<TomlConfig>> {
    if !path.exists() {
        warn!("Config file not found at {}, using defaults", path.display());
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str::<TomlConfig>(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Loaded config from {}", path.display());
    Ok(Some(config))
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn default_state_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("photoenh"))
        .unwrap_or_else(|| PathBuf::from("./photoenh_data"))
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .map(|d| d.join("photoenh"))
        .unwrap_or_else(|| PathBuf::from("./downloads"))
}
