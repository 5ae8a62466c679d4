//! Command-line interface definitions for mirrorsync.
//!
//! The CLI definitions are shared between the main binary and build tools
//! (like xtask) for man page generation.

use crate::config::{Config, MissingSource};
use anyhow::Result;
use clap::Parser;
use clap_complete::Shell;
use std::path::PathBuf;

/// Main CLI structure for mirrorsync.
#[derive(Parser, Debug)]
#[command(
    name = "mirrorsync",
    version = crate::VERSION,
    about = "Synchronize two folders at a specific interval and log any changes",
    long_about = "One-way mirror of a source folder into a replica folder. Every pass creates, \
                  updates and deletes replica entries until they match the source, comparing \
                  file contents by fingerprint."
)]
pub struct Cli {
    /// Source folder to mirror from
    #[arg(short, long, value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// Replica folder to mirror into (created if missing)
    #[arg(short, long, value_name = "DIR")]
    pub replica: Option<PathBuf>,

    /// Log file, truncated at startup [default: logs.txt]
    #[arg(short, long, value_name = "FILE")]
    pub logs: Option<PathBuf>,

    /// Seconds to wait after each pass before the next [default: 2.0]
    #[arg(short, long, value_name = "SECONDS")]
    pub interval: Option<f64>,

    /// TOML configuration file; command-line flags override its values
    #[arg(short, long, value_name = "FILE", env = crate::CONFIG_ENV_VAR)]
    pub config: Option<PathBuf>,

    /// Run a single pass and exit (non-zero exit status if any node failed)
    #[arg(long)]
    pub once: bool,

    /// Create the source folder if it does not exist instead of failing
    #[arg(long)]
    pub create_source: bool,

    /// Show debug logs and no-op pass summaries
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print warnings and errors on the terminal (the log file is unaffected)
    #[arg(short, long)]
    pub quiet: bool,

    /// Print a shell completion script and exit
    #[arg(long, value_enum, value_name = "SHELL", exclusive = true)]
    pub completions: Option<Shell>,
}

impl Cli {
    /// Builds the effective configuration: config file (if any), then flags on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed.
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(source) = &self.source {
            config.sync.source = Some(source.clone());
        }
        if let Some(replica) = &self.replica {
            config.sync.replica = Some(replica.clone());
        }
        if let Some(interval) = self.interval {
            config.sync.interval = interval;
        }
        if let Some(logs) = &self.logs {
            config.logging.file = Some(logs.clone());
        }
        if self.create_source {
            config.sync.missing_source = MissingSource::Create;
        }
        if self.verbose {
            config.logging.level = "debug".to_string();
        }

        Ok(config)
    }
}
