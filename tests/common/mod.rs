#![allow(dead_code)]

use anyhow::Result;
use mirrorsync::sync::{self, PassResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Flattened tree: relative path to `None` for directories or the file content.
pub type Listing = BTreeMap<PathBuf, Option<Vec<u8>>>;

/// Source and replica roots under one temporary directory
pub struct TestTree {
    pub temp_dir: TempDir,
    pub source: PathBuf,
    pub replica: PathBuf,
}

impl TestTree {
    /// Create empty source and replica roots
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("source");
        let replica = temp_dir.path().join("replica");
        fs::create_dir(&source)?;
        fs::create_dir(&replica)?;

        Ok(Self {
            temp_dir,
            source,
            replica,
        })
    }

    /// Get the temporary directory path
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a source file, creating missing parents
    pub fn write_source(&self, rel: &str, content: impl AsRef<[u8]>) -> Result<PathBuf> {
        write_file(&self.source.join(rel), content.as_ref())
    }

    /// Write a replica file, creating missing parents
    pub fn write_replica(&self, rel: &str, content: impl AsRef<[u8]>) -> Result<PathBuf> {
        write_file(&self.replica.join(rel), content.as_ref())
    }

    pub fn mkdir_source(&self, rel: &str) -> Result<PathBuf> {
        let path = self.source.join(rel);
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    pub fn mkdir_replica(&self, rel: &str) -> Result<PathBuf> {
        let path = self.replica.join(rel);
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    pub fn read_replica(&self, rel: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.replica.join(rel))?)
    }

    /// Run one synchronization pass
    pub fn sync(&self) -> PassResult {
        sync::synchronize(&self.source, &self.replica)
    }

    /// Replica path for a relative path, as it appears in events
    pub fn replica_path(&self, rel: &str) -> PathBuf {
        if rel.is_empty() {
            self.replica.clone()
        } else {
            self.replica.join(rel)
        }
    }

    /// Panics unless the replica is an exact image of the source
    pub fn assert_mirrored(&self) {
        assert_eq!(listing(&self.source), listing(&self.replica));
    }
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new().expect("Failed to create test tree")
    }
}

fn write_file(path: &Path, content: &[u8]) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(path.to_path_buf())
}

/// Flatten everything under `root` (the root itself excluded)
pub fn listing(root: &Path) -> Listing {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|entry| {
            let entry = entry.expect("Failed to walk test tree");
            let rel = entry
                .path()
                .strip_prefix(root)
                .expect("walk stays under root")
                .to_path_buf();
            let content = if entry.file_type().is_dir() {
                None
            } else {
                Some(fs::read(entry.path()).expect("Failed to read test file"))
            };
            (rel, content)
        })
        .collect()
}

/// Root ignores permission bits, so permission-denied scenarios cannot be staged
#[cfg(unix)]
pub fn running_as_root() -> bool {
    // SAFETY: geteuid has no preconditions.
    unsafe { libc::geteuid() == 0 }
}
