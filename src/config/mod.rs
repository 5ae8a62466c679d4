pub mod parser;
pub mod validator;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Directory mirrored from
    #[serde(default)]
    pub source: Option<PathBuf>,
    /// Directory mirrored into
    #[serde(default)]
    pub replica: Option<PathBuf>,
    /// Seconds between the end of one pass and the start of the next
    #[serde(default = "default_interval")]
    pub interval: f64,
    #[serde(default)]
    pub missing_source: MissingSource,
    #[serde(default = "default_create_replica")]
    pub create_replica: bool,
}

/// What to do when the source root does not exist at startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingSource {
    /// Refuse to start
    #[default]
    Fail,
    /// Create an empty source directory
    Create,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log file, truncated at startup. `None` disables the file sink.
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            source: None,
            replica: None,
            interval: default_interval(),
            missing_source: MissingSource::Fail,
            create_replica: default_create_replica(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            level: default_level(),
        }
    }
}

impl SyncConfig {
    /// Interval as a [`Duration`]. Only meaningful after validation.
    #[must_use]
    pub fn interval_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.interval).unwrap_or(Duration::ZERO)
    }
}

impl Config {
    /// Load configuration from a file
    ///
    /// Unlike the source and replica roots, a configuration file is never
    /// created on demand: a missing file is an error.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file does not exist or cannot be read
    /// - The file contains invalid TOML or unknown keys
    pub fn load(path: &Path) -> Result<Self> {
        parser::parse_config_file(path)
    }

    /// Short one-line description used in the startup log line
    #[must_use]
    pub fn describe(&self) -> String {
        let show = |p: &Option<PathBuf>| {
            p.as_deref()
                .map_or_else(|| "<unset>".to_string(), |p| p.display().to_string())
        };
        format!(
            "source={}, replica={}, logs={}, interval={}",
            show(&self.sync.source),
            show(&self.sync.replica),
            show(&self.logging.file),
            self.sync.interval
        )
    }
}

// Default functions for serde
const fn default_interval() -> f64 {
    crate::DEFAULT_INTERVAL_SECS
}

const fn default_create_replica() -> bool {
    true
}

fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from(crate::DEFAULT_LOG_FILE))
}

fn default_level() -> String {
    "info".to_string()
}
