use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Maps paths under a source root onto the same relative location under a replica root.
///
/// The substitution is done component-wise through [`Path::strip_prefix`], so a
/// source root of `/data/a` never matches `/data/ab/file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapping {
    /// Root of the tree treated as ground truth
    source_root: PathBuf,
    /// Root of the tree kept in sync
    replica_root: PathBuf,
}

impl PathMapping {
    /// Creates a mapping between two roots.
    #[must_use]
    pub fn new(source_root: &Path, replica_root: &Path) -> Self {
        Self {
            source_root: source_root.to_path_buf(),
            replica_root: replica_root.to_path_buf(),
        }
    }

    #[must_use]
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    #[must_use]
    pub fn replica_root(&self) -> &Path {
        &self.replica_root
    }

    /// Maps a source path to its replica counterpart.
    ///
    /// # Errors
    ///
    /// Returns an error if `source_path` is not under the source root.
    pub fn to_replica(&self, source_path: &Path) -> Result<PathBuf> {
        let relative = source_path.strip_prefix(&self.source_root).with_context(|| {
            format!(
                "{} is outside source root {}",
                source_path.display(),
                self.source_root.display()
            )
        })?;

        if relative.as_os_str().is_empty() {
            Ok(self.replica_root.clone())
        } else {
            Ok(self.replica_root.join(relative))
        }
    }
}

/// Expands tilde in path to home directory
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    if let Some(path_str) = path.to_str() {
        if path_str.starts_with("~/") || path_str == "~" {
            let home = dirs::home_dir().context("Could not find home directory")?;
            if path_str == "~" {
                Ok(home)
            } else {
                Ok(home.join(&path_str[2..]))
            }
        } else {
            Ok(path.to_path_buf())
        }
    } else {
        Ok(path.to_path_buf())
    }
}

/// Makes a path absolute, resolving relative paths from current directory
///
/// # Errors
///
/// Returns an error if the current directory cannot be determined
pub fn make_absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let current_dir = std::env::current_dir()?;
        Ok(current_dir.join(path))
    }
}

/// Checks if a path is within (or equal to) a base directory
///
/// Both paths are canonicalized when they exist so that symlinks and `..`
/// components cannot hide nesting.
#[must_use]
pub fn is_within_directory(path: &Path, base: &Path) -> bool {
    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
    path.starts_with(base)
}
