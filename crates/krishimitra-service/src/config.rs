//! Service configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use krishimitra_sync::SyncOptions;

/// Service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage settings.
    pub storage: StorageConfig,
    /// Remote backend settings.
    pub remote: RemoteConfig,
    /// Sync loop settings.
    pub sync: SyncConfig,
    /// Connectivity probe settings.
    pub connectivity: ConnectivityConfig,
}

impl Config {
    /// Load configuration from the default path, or defaults if it is missing.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        // Create parent directories if needed
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return every problem found.
    ///
    /// This checks:
    /// - Storage path is not empty
    /// - Remote URL uses http or https (unless simulating)
    /// - Sync interval is within bounds (5s - 1 hour)
    /// - Request timeout is positive and shorter than the sync interval
    /// - Advisory window is between 1 hour and 30 days, and the limit is positive
    /// - Probe interval is positive
    ///
    /// # Example
    ///
    /// ```
    /// use krishimitra_service::Config;
    ///
    /// let config = Config::default();
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.storage.validate());
        errors.extend(self.remote.validate());
        errors.extend(self.sync.validate());
        errors.extend(self.connectivity.validate());

        // A request must be able to time out before the next tick is due
        if self.remote.request_timeout >= self.sync.interval {
            errors.push(ValidationError {
                field: "remote.request_timeout".to_string(),
                message: format!(
                    "request timeout {}s must be shorter than the sync interval {}s",
                    self.remote.request_timeout, self.sync.interval
                ),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Sync manager options derived from this configuration.
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions::new()
            .interval(Duration::from_secs(self.sync.interval))
            .request_timeout(self.remote.request_timeout())
            .advisory_window(Duration::from_secs(
                self.sync.advisory_window_hours.saturating_mul(60 * 60),
            ))
            .advisory_limit(self.sync.advisory_limit)
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: krishimitra_store::default_db_path(),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.path".to_string(),
                message: "database path cannot be empty".to_string(),
            });
        }

        errors
    }
}

/// Remote backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the KrishiMitra backend.
    pub base_url: String,
    /// Generate remote data locally instead of calling `base_url`.
    pub simulate: bool,
    /// Per-request timeout in seconds.
    pub request_timeout: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            simulate: false,
            request_timeout: 10,
        }
    }
}

impl RemoteConfig {
    /// Validate remote configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // The simulated remote never dials out, so any URL is fine
        if !self.simulate {
            if self.base_url.is_empty() {
                errors.push(ValidationError {
                    field: "remote.base_url".to_string(),
                    message: "base URL cannot be empty".to_string(),
                });
            } else if !self.base_url.starts_with("http://")
                && !self.base_url.starts_with("https://")
            {
                errors.push(ValidationError {
                    field: "remote.base_url".to_string(),
                    message: format!(
                        "invalid base URL '{}': must start with http:// or https://",
                        self.base_url
                    ),
                });
            }
        }

        if self.request_timeout == 0 {
            errors.push(ValidationError {
                field: "remote.request_timeout".to_string(),
                message: "request timeout must be at least 1 second".to_string(),
            });
        }

        errors
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

/// Minimum sync interval in seconds.
pub const MIN_SYNC_INTERVAL: u64 = 5;
/// Maximum sync interval in seconds (1 hour).
pub const MAX_SYNC_INTERVAL: u64 = 3600;
/// Longest advisory rate-limit window in hours (30 days).
pub const MAX_ADVISORY_WINDOW_HOURS: u64 = 30 * 24;

/// Sync loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between periodic syncs while online.
    pub interval: u64,
    /// Hours the advisory rate limit looks back over.
    pub advisory_window_hours: u64,
    /// Recent advisories that hold back a new weather advisory.
    pub advisory_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: 30,
            advisory_window_hours: 24,
            advisory_limit: 3,
        }
    }
}

impl SyncConfig {
    /// Validate sync configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.interval < MIN_SYNC_INTERVAL {
            errors.push(ValidationError {
                field: "sync.interval".to_string(),
                message: format!(
                    "sync interval {} is too short (minimum {} seconds)",
                    self.interval, MIN_SYNC_INTERVAL
                ),
            });
        } else if self.interval > MAX_SYNC_INTERVAL {
            errors.push(ValidationError {
                field: "sync.interval".to_string(),
                message: format!(
                    "sync interval {} is too long (maximum {} seconds / 1 hour)",
                    self.interval, MAX_SYNC_INTERVAL
                ),
            });
        }

        if self.advisory_window_hours == 0 {
            errors.push(ValidationError {
                field: "sync.advisory_window_hours".to_string(),
                message: "advisory window must be at least 1 hour".to_string(),
            });
        } else if self.advisory_window_hours > MAX_ADVISORY_WINDOW_HOURS {
            errors.push(ValidationError {
                field: "sync.advisory_window_hours".to_string(),
                message: format!(
                    "advisory window {} is too long (maximum {} hours)",
                    self.advisory_window_hours, MAX_ADVISORY_WINDOW_HOURS
                ),
            });
        }

        if self.advisory_limit == 0 {
            errors.push(ValidationError {
                field: "sync.advisory_limit".to_string(),
                message: "advisory limit must be at least 1".to_string(),
            });
        }

        errors
    }
}

/// Connectivity probe configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// Seconds between health checks.
    pub probe_interval: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self { probe_interval: 15 }
    }
}

impl ConnectivityConfig {
    /// Validate connectivity configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.probe_interval == 0 {
            errors.push(ValidationError {
                field: "connectivity.probe_interval".to_string(),
                message: "probe interval must be at least 1 second".to_string(),
            });
        }

        errors
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `sync.interval`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("krishimitra")
        .join("sync.toml")
}
