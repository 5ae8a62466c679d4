use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Replica-mapped paths that should exist because they exist in the source.
///
/// Built during the propagate phase and only read during the prune phase.
/// Directories under a protected prefix are ones whose source counterpart could
/// not be listed; nothing beneath them may be pruned because the snapshot is
/// incomplete there.
#[derive(Debug, Default)]
pub struct SourceSnapshot {
    /// Mapped directories
    dirs: HashSet<PathBuf>,
    /// Mapped files
    files: HashSet<PathBuf>,
    /// Mapped directories whose source listing failed
    protected: Vec<PathBuf>,
}

impl SourceSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_dir(&mut self, path: PathBuf) {
        self.dirs.insert(path);
    }

    pub fn insert_file(&mut self, path: PathBuf) {
        self.files.insert(path);
    }

    /// Marks a mapped directory whose source contents are unknown this pass.
    pub fn protect(&mut self, path: PathBuf) {
        self.protected.push(path);
    }

    /// Whether a replica file must be kept.
    #[must_use]
    pub fn keeps_file(&self, path: &Path) -> bool {
        self.files.contains(path) || self.is_protected(path)
    }

    /// Whether a replica directory must be kept.
    #[must_use]
    pub fn keeps_dir(&self, path: &Path) -> bool {
        self.dirs.contains(path) || self.is_protected(path)
    }

    /// Whether the path lies at or under a directory that could not be listed.
    fn is_protected(&self, path: &Path) -> bool {
        self.protected.iter().any(|p| path.starts_with(p))
    }

    #[must_use]
    pub fn dir_count(&self) -> usize {
        self.dirs.len()
    }

    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}
