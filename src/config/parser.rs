use super::Config;
use crate::utils::paths::expand_tilde;
use anyhow::{Context, Result};
use std::path::Path;

/// Reads and parses a TOML configuration file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid configuration.
pub fn parse_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config_str(&content)
        .with_context(|| format!("Invalid config file: {}", path.display()))
}

/// Parses configuration from a TOML string, expanding `~` in every path.
///
/// # Errors
///
/// Returns an error on invalid TOML, unknown keys, or an unresolvable home directory.
pub fn parse_config_str(content: &str) -> Result<Config> {
    let mut config: Config =
        toml::from_str(content).with_context(|| "Failed to parse TOML config")?;

    // Paths in config files may use ~ for the home directory
    config.sync.source = config.sync.source.as_deref().map(expand_tilde).transpose()?;
    config.sync.replica = config.sync.replica.as_deref().map(expand_tilde).transpose()?;
    config.logging.file = config.logging.file.as_deref().map(expand_tilde).transpose()?;

    Ok(config)
}
