//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. `YTSORT_ROOT_FOLDER` environment variable
//! 3. `root_folder` key in the TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing TOML file at the default location is not an error: a warning is
//! logged and compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "YTSORT_ROOT_FOLDER";

/// Environment variable overriding the API access token
pub const ACCESS_TOKEN_ENV: &str = "YTSORT_ACCESS_TOKEN";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "ytsort.db";

/// Default ranks file name inside the root folder
pub const RANKS_FILE: &str = "ranks.toml";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub ranks_file: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub api: ApiConfig,
    pub organizer: OrganizerConfig,
}

/// `[logging]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `[api]` section: remote collection API access and pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub access_token: Option<String>,
    /// Items per page for paginated listings (remote maximum is 50)
    pub page_size: u32,
    /// Minimum spacing between consecutive remote requests
    pub request_interval_ms: u64,
    pub timeout_secs: u64,
    /// Concurrent workers per detail-lookup batch
    pub detail_workers: usize,
    /// Delay between worker starts inside one batch
    pub worker_start_delay_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            access_token: None,
            page_size: 50,
            request_interval_ms: 200,
            timeout_secs: 30,
            detail_workers: 4,
            worker_start_delay_ms: 100,
        }
    }
}

impl ApiConfig {
    /// Resolve the access token: environment first, then TOML
    pub fn resolve_access_token(&self) -> Result<String> {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.trim().is_empty() {
                info!("Access token loaded from environment variable");
                return Ok(token);
            }
        }

        match &self.access_token {
            Some(token) if !token.trim().is_empty() => {
                info!("Access token loaded from TOML config");
                Ok(token.clone())
            }
            _ => Err(Error::Config(format!(
                "API access token not configured. Set {} or [api] access_token in config.toml",
                ACCESS_TOKEN_ENV
            ))),
        }
    }
}

/// Length of time expressed as days/hours/minutes/seconds, as written in config files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DurationSpec {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl DurationSpec {
    pub fn as_secs(&self) -> u64 {
        self.seconds + self.minutes * 60 + self.hours * 60 * 60 + self.days * 24 * 60 * 60
    }
}

/// `[organizer]` section: capacity and validity policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizerConfig {
    /// Maximum primary collection length before overflow goes to backlog
    pub max_length: usize,
    /// Maximum number of filler items added to the primary collection
    pub filler_length: usize,
    /// Items must be strictly longer than this
    pub min_duration: DurationSpec,
    /// Items must be strictly shorter than this
    pub max_duration: DurationSpec,
    /// Verify/correct iteration ceiling per collection
    pub max_iterations: usize,
    /// Pause after a correction pass before verifying again, letting remote writes settle
    pub verify_wait_secs: u64,
    /// Correction passes kept per collection; older ones are pruned
    pub history_per_collection: usize,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            max_length: 40,
            filler_length: 10,
            min_duration: DurationSpec {
                minutes: 1,
                ..Default::default()
            },
            max_duration: DurationSpec {
                hours: 3,
                ..Default::default()
            },
            max_iterations: 5,
            verify_wait_secs: 0,
            history_per_collection: 100,
        }
    }
}

impl OrganizerConfig {
    /// Minimum primary length: half the maximum, rounded up
    pub fn min_length(&self) -> usize {
        self.max_length.div_ceil(2)
    }
}

impl TomlConfig {
    /// Path of the ranks file, relative paths resolved against the root folder
    pub fn ranks_path(&self, root_folder: &Path) -> PathBuf {
        match &self.ranks_file {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => root_folder.join(path),
            None => root_folder.join(RANKS_FILE),
        }
    }
}

/// Default configuration file path for the platform (`<config_dir>/ytsort/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ytsort").join("config.toml"))
}

/// Load TOML configuration
///
/// An explicitly requested file must exist. When no path is given the platform
/// default is tried, and compiled defaults are used if it does not exist.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            Some(path) => {
                warn!(
                    "Config file {} not found, using compiled defaults",
                    path.display()
                );
                return Ok(TomlConfig::default());
            }
            None => {
                warn!("Could not determine config directory, using compiled defaults");
                return Ok(TomlConfig::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path)?;
    let config = parse_toml_config(&content)?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Parse TOML configuration text
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Resolve the root folder following the priority order in the module docs
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("ytsort"))
        .unwrap_or_else(|| PathBuf::from("./ytsort_data"))
}

/// Create the root folder if missing and return the database path inside it
pub fn ensure_root_folder(root_folder: &Path) -> Result<PathBuf> {
    if !root_folder.exists() {
        std::fs::create_dir_all(root_folder)?;
        info!("Created root folder: {}", root_folder.display());
    }
    Ok(root_folder.join(DATABASE_FILE))
}
