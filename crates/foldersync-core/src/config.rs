//! Configuration module for foldersync.
//!
//! Provides typed configuration structs that map to an optional YAML
//! configuration file, with loading, validation, defaults, and a builder
//! pattern used by the command line to layer positional arguments on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::newtypes::normalize_path;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for foldersync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

/// Synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Directory tree that is mirrored. Must exist.
    pub source: PathBuf,
    /// Directory tree kept identical to `source`. Created if absent.
    pub replica: PathBuf,
    /// Seconds to sleep between the end of one pass and the start of the next.
    pub interval_secs: u64,
}

/// Action log and diagnostics settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Diagnostic level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Path to the append-only action log. Parent directories are created.
    pub file: PathBuf,
    /// Live notice format on the console: `human` or `json`.
    pub notice_format: String,
}

impl SyncConfig {
    /// The configured interval as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/foldersync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("foldersync")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            replica: PathBuf::new(),
            interval_secs: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("foldersync");
        Self {
            level: "info".to_string(),
            file: data_dir.join("foldersync.log"),
            notice_format: "human".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.interval_secs"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.notice_format`.
const VALID_NOTICE_FORMATS: &[&str] = &["human", "json"];

/// Resolve a root for the nesting checks.
///
/// The deepest existing ancestor is canonicalized and the missing tail is
/// appended, so a replica that does not exist yet still compares correctly
/// against a source reached through a symlink.
fn resolve_root(path: &Path) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    let absolute = normalize_path(path, &cwd).ok()?;

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(canonical) = std::fs::canonicalize(existing) {
            return Some(missing.iter().rev().fold(canonical, |acc, part| acc.join(part)));
        }
        missing.push(existing.file_name()?);
        existing = existing.parent()?;
    }
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid. Any error here is
    /// fatal at startup.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        let source = &self.sync.source;
        if source.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "sync.source".into(),
                message: "is required".into(),
            });
        } else if !source.exists() {
            errors.push(ValidationError {
                field: "sync.source".into(),
                message: format!("directory does not exist: {}", source.display()),
            });
        } else if !source.is_dir() {
            errors.push(ValidationError {
                field: "sync.source".into(),
                message: format!("not a directory: {}", source.display()),
            });
        }

        let replica = &self.sync.replica;
        if replica.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "sync.replica".into(),
                message: "is required".into(),
            });
        } else if replica.exists() && !replica.is_dir() {
            errors.push(ValidationError {
                field: "sync.replica".into(),
                message: format!("exists and is not a directory: {}", replica.display()),
            });
        }

        // Nested roots would make the reverse pass delete the source, or the
        // forward pass copy the replica into itself.
        if !source.as_os_str().is_empty() && !replica.as_os_str().is_empty() {
            if let (Some(src), Some(dst)) = (resolve_root(source), resolve_root(replica)) {
                if src == dst {
                    errors.push(ValidationError {
                        field: "sync.replica".into(),
                        message: "must differ from sync.source".into(),
                    });
                } else if dst.starts_with(&src) {
                    errors.push(ValidationError {
                        field: "sync.replica".into(),
                        message: format!("must not be inside sync.source ({})", src.display()),
                    });
                } else if src.starts_with(&dst) {
                    errors.push(ValidationError {
                        field: "sync.source".into(),
                        message: format!("must not be inside sync.replica ({})", dst.display()),
                    });
                }
            }
        }

        if self.sync.interval_secs == 0 {
            errors.push(ValidationError {
                field: "sync.interval_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }
        if self.logging.file.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "logging.file".into(),
                message: "is required".into(),
            });
        } else if self.logging.file.is_dir() {
            errors.push(ValidationError {
                field: "logging.file".into(),
                message: format!("is a directory: {}", self.logging.file.display()),
            });
        } else if !replica.as_os_str().is_empty() {
            // The reverse pass would prune it
            if let (Some(log), Some(dst)) = (resolve_root(&self.logging.file), resolve_root(replica)) {
                if log.starts_with(&dst) {
                    errors.push(ValidationError {
                        field: "logging.file".into(),
                        message: format!("must not be inside sync.replica ({})", dst.display()),
                    });
                }
            }
        }
        if !VALID_NOTICE_FORMATS.contains(&self.logging.notice_format.as_str()) {
            errors.push(ValidationError {
                field: "logging.notice_format".into(),
                message: format!(
                    "invalid format '{}'; valid options: {}",
                    self.logging.notice_format,
                    VALID_NOTICE_FORMATS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] (or a loaded file) and allows selective
/// overrides.
///
/// # Example
///
/// ```rust,no_run
/// use foldersync_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .sync_source(PathBuf::from("/data/source"))
///     .sync_replica(PathBuf::from("/data/replica"))
///     .sync_interval_secs(30)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Start from an existing configuration, e.g. one loaded from YAML.
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    // --- sync ---

    pub fn sync_source(mut self, source: PathBuf) -> Self {
        self.config.sync.source = source;
        self
    }

    pub fn sync_replica(mut self, replica: PathBuf) -> Self {
        self.config.sync.replica = replica;
        self
    }

    pub fn sync_interval_secs(mut self, seconds: u64) -> Self {
        self.config.sync.interval_secs = seconds;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_file(mut self, file: PathBuf) -> Self {
        self.config.logging.file = file;
        self
    }

    pub fn logging_notice_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.notice_format = format.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
