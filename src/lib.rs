#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
// Allow pedantic strict lints that create false positives in this codebase
#![allow(clippy::arithmetic_side_effects)] // Simple counters cannot overflow
#![allow(clippy::float_arithmetic)] // Required for interval and duration formatting

//! # Mirrorsync - One-Way Directory Mirroring
//!
//! Mirrorsync keeps a replica directory tree identical to a source directory
//! tree. Every synchronization pass creates, updates and deletes entries in the
//! replica until it matches the source, logging each mutation as a structured
//! event.
//!
//! ## Features
//!
//! - **Content Fingerprinting**: Files are compared with xxHash3-128 digests, never by mtime
//! - **Atomic Replace**: Updated files are written to a temp file and renamed into place
//! - **Ordered Reconciliation**: Pre-order propagation, then post-order pruning
//! - **Failure Isolation**: One unreadable file never stops the rest of the tree converging
//! - **Non-overlapping Passes**: In-process scheduler plus a cross-process pass lock
//!
//! ## Architecture
//!
//! - [`sync`]: The tree reconciler, source snapshot and event stream
//! - [`utils`]: Fingerprint comparator and path mapping helpers
//! - [`config`]: Configuration parsing and root validation
//! - [`scheduler`]: Interval loop that never re-enters a running pass
//! - [`lock`]: Cross-process pass lock keyed by replica root
//! - [`logging`]: Tracing subscriber setup (stdout + log file)
//! - [`output`]: Terminal summaries of each pass
//!
//! ## Example Usage
//!
//! ```no_run
//! use mirrorsync::MirrorContext;
//! use mirrorsync::config::Config;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut config = Config::default();
//! config.sync.source = Some("data".into());
//! config.sync.replica = Some("backup".into());
//!
//! let ctx = MirrorContext::new(config)?;
//! let result = ctx.run_pass()?;
//! println!("{} changes", result.mutation_count());
//! # Ok(())
//! # }
//! ```

/// Command-line interface definitions (argument parsing structures).
pub mod cli;

/// Configuration parsing, validation, and root preparation.
pub mod config;

/// Cross-process locking so two passes never touch the same replica at once.
pub mod lock;

/// Tracing subscriber initialization.
pub mod logging;

/// Output formatting for pass summaries.
pub mod output;

/// Interval scheduling of synchronization passes.
pub mod scheduler;

/// Tree reconciliation: propagate, snapshot, prune.
pub mod sync;

/// Utility functions and helpers.
pub mod utils;

use anyhow::Result;
use std::path::PathBuf;
use tracing::warn;

/// Current version of the mirrorsync binary.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default log file written next to the working directory.
pub const DEFAULT_LOG_FILE: &str = "logs.txt";

/// Default number of seconds between the end of one pass and the start of the next.
pub const DEFAULT_INTERVAL_SECS: f64 = 2.0;

/// Environment variable naming a TOML configuration file.
pub const CONFIG_ENV_VAR: &str = "MIRRORSYNC_CONFIG";

/// Central context for running synchronization passes.
///
/// Holds the resolved configuration and the validated, absolute source and
/// replica roots. Building a context performs every pass-start precondition
/// check, so a context that exists is always safe to run a pass with.
///
/// # Examples
///
/// ```no_run
/// use mirrorsync::MirrorContext;
/// use mirrorsync::config::Config;
///
/// # fn main() -> anyhow::Result<()> {
/// let config = Config::load("mirrorsync.toml".as_ref())?;
/// let ctx = MirrorContext::new(config)?;
/// ctx.run_pass()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MirrorContext {
    /// Resolved configuration.
    pub config: config::Config,

    /// Absolute path of the source root.
    pub source_root: PathBuf,

    /// Absolute path of the replica root.
    pub replica_root: PathBuf,

    /// Directory holding pass lock files.
    pub locks_dir: PathBuf,
}

impl MirrorContext {
    /// Creates a context from a configuration, validating it and preparing both roots.
    ///
    /// # Errors
    /// Returns a [`config::validator::ConfigError`] (wrapped in `anyhow`) if the
    /// configuration is invalid, the source root is missing under the `fail`
    /// policy, or the replica root cannot be created.
    pub fn new(config: config::Config) -> Result<Self> {
        config::validator::validate_config(&config)?;
        let roots =
            config::validator::prepare_roots(&config.sync, config.logging.file.as_deref())?;

        Ok(Self {
            config,
            source_root: roots.source,
            replica_root: roots.replica,
            locks_dir: lock::default_locks_dir(),
        })
    }

    /// Overrides the lock directory (used by tests to stay out of the system temp dir).
    #[must_use]
    pub fn with_locks_dir(mut self, locks_dir: PathBuf) -> Self {
        self.locks_dir = locks_dir;
        self
    }

    /// Runs exactly one synchronization pass while holding the pass lock.
    ///
    /// Returns `Ok(None)` if another process currently holds the lock for this
    /// replica; the pass is skipped and will be retried by the caller.
    ///
    /// # Errors
    /// Returns an error only if the lock file itself cannot be created. Per-node
    /// failures are reported inside the returned [`sync::PassResult`].
    pub fn try_run_pass(&self) -> Result<Option<sync::PassResult>> {
        let Some(_lock) = lock::PassLock::try_acquire(&self.locks_dir, &self.replica_root)? else {
            warn!(
                replica = %self.replica_root.display(),
                "Another pass is running against this replica, skipping"
            );
            return Ok(None);
        };

        Ok(Some(sync::synchronize(
            &self.source_root,
            &self.replica_root,
        )))
    }

    /// Runs one pass, failing if another process holds the pass lock.
    ///
    /// # Errors
    /// Returns an error if the lock is held elsewhere or cannot be created.
    pub fn run_pass(&self) -> Result<sync::PassResult> {
        self.try_run_pass()?.ok_or_else(|| {
            anyhow::anyhow!(
                "Another synchronization pass is already running for {}",
                self.replica_root.display()
            )
        })
    }
}
