//! Pass-start precondition checks.
//!
//! Everything here runs before the first pass. Failures are configuration
//! errors: the caller must not start synchronizing until they are fixed.

use super::{Config, MissingSource, SyncConfig};
use crate::utils::paths::{is_within_directory, make_absolute};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Fatal configuration errors, detected before any pass runs
#[derive(Debug)]
pub enum ConfigError {
    /// A required root was not given on the command line or in the config file
    MissingRoot(&'static str),
    /// Interval is zero, negative or not a finite number
    InvalidInterval(f64),
    /// Source root does not exist and the policy is to fail
    SourceNotFound(PathBuf),
    /// A root exists but is not a directory
    NotADirectory(PathBuf),
    /// Replica root is absent and may not be created
    ReplicaNotFound(PathBuf),
    /// A root could not be created or resolved
    Io(PathBuf, std::io::Error),
    /// Source and replica overlap, so mirroring would recurse or delete the source
    Overlapping {
        /// Source root
        source: PathBuf,
        /// Replica root
        replica: PathBuf,
    },
    /// The log file would be mirrored (inside the source) or pruned (inside the replica)
    LogInsideRoot {
        /// Log file
        log: PathBuf,
        /// Root that contains it
        root: PathBuf,
    },
}

impl ConfigError {
    /// Get a user-friendly error message with actionable guidance
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingRoot(which) => {
                format!("No {which} directory given. Pass --{which} <DIR> or set sync.{which} in the config file")
            }
            Self::InvalidInterval(secs) => {
                format!("Interval must be a positive number of seconds, got {secs}")
            }
            Self::SourceNotFound(path) => format!(
                "Source folder \"{}\" not found. Use --create-source to create it instead",
                path.display()
            ),
            Self::NotADirectory(path) => format!("{} exists but is not a directory", path.display()),
            Self::ReplicaNotFound(path) => format!(
                "Replica folder \"{}\" not found and create_replica is disabled",
                path.display()
            ),
            Self::Io(path, err) => format!("Cannot prepare {}: {err}", path.display()),
            Self::Overlapping { source, replica } => format!(
                "Source {} and replica {} overlap; one must not contain the other",
                source.display(),
                replica.display()
            ),
            Self::LogInsideRoot { log, root } => format!(
                "Log file {} is inside {}; write it outside both the source and the replica",
                log.display(),
                root.display()
            ),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(_, err) => Some(err),
            _ => None,
        }
    }
}

/// Absolute, existing roots that a pass can run against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRoots {
    /// Source root
    pub source: PathBuf,
    /// Replica root
    pub replica: PathBuf,
}

/// Checks values that do not touch the filesystem.
///
/// # Errors
///
/// Returns an error if a root is unset or the interval is not positive.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.sync.source.is_none() {
        return Err(ConfigError::MissingRoot("source"));
    }
    if config.sync.replica.is_none() {
        return Err(ConfigError::MissingRoot("replica"));
    }
    let interval = config.sync.interval;
    if !interval.is_finite() || interval <= 0.0 {
        return Err(ConfigError::InvalidInterval(interval));
    }
    Ok(())
}

/// Resolves both roots to absolute paths, applying the missing-source policy
/// and creating the replica root if allowed.
///
/// `log_file`, when given, must lie outside both roots: a log inside the
/// source changes on every pass, and one inside the replica gets pruned.
///
/// # Errors
///
/// Returns a [`ConfigError`] for any condition under which a pass must not run.
pub fn prepare_roots(
    sync: &SyncConfig,
    log_file: Option<&Path>,
) -> Result<PreparedRoots, ConfigError> {
    let source = absolute(sync.source.as_deref().ok_or(ConfigError::MissingRoot("source"))?)?;
    let replica = absolute(
        sync.replica
            .as_deref()
            .ok_or(ConfigError::MissingRoot("replica"))?,
    )?;
    let log = log_file.map(absolute).transpose()?;
    if let Some(log) = &log {
        check_log_file(log, &source, &replica, |log, root| log.starts_with(root))?;
    }

    if !source.exists() {
        match sync.missing_source {
            MissingSource::Fail => return Err(ConfigError::SourceNotFound(source)),
            MissingSource::Create => {
                fs::create_dir_all(&source).map_err(|e| ConfigError::Io(source.clone(), e))?;
                info!(path = %source.display(), "Created missing source folder");
            }
        }
    }
    if !source.is_dir() {
        return Err(ConfigError::NotADirectory(source));
    }

    // Checked lexically first so a nested replica is never created inside the source
    if overlaps(&source, &replica) {
        return Err(ConfigError::Overlapping { source, replica });
    }

    if !replica.exists() {
        if !sync.create_replica {
            return Err(ConfigError::ReplicaNotFound(replica));
        }
        fs::create_dir_all(&replica).map_err(|e| ConfigError::Io(replica.clone(), e))?;
        info!(path = %replica.display(), "Created replica folder");
    }
    if !replica.is_dir() {
        return Err(ConfigError::NotADirectory(replica));
    }

    if is_within_directory(&replica, &source) || is_within_directory(&source, &replica) {
        return Err(ConfigError::Overlapping { source, replica });
    }
    if let Some(log) = &log {
        check_log_file(log, &source, &replica, log_within)?;
    }

    Ok(PreparedRoots { source, replica })
}

/// Rejects a log file at or under either root according to `within`.
fn check_log_file(
    log: &Path,
    source: &Path,
    replica: &Path,
    within: fn(&Path, &Path) -> bool,
) -> Result<(), ConfigError> {
    match [source, replica].into_iter().find(|root| within(log, root)) {
        Some(root) => Err(ConfigError::LogInsideRoot {
            log: log.to_path_buf(),
            root: root.to_path_buf(),
        }),
        None => Ok(()),
    }
}

/// Canonical containment for a log file that may not exist yet.
fn log_within(log: &Path, root: &Path) -> bool {
    is_within_directory(log, root) || log.parent().is_some_and(|p| is_within_directory(p, root))
}
