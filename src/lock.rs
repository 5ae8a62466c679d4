//! Pass locking to prevent overlapping synchronization passes
//!
//! Within one process the scheduler already never starts a pass while another
//! is running. This module extends that guarantee across processes: two
//! `mirrorsync` instances pointed at the same replica take turns instead of
//! racing on directory creation and deletion. Locks are released when dropped
//! or when the owning process exits.

use crate::utils::hash::{hash_bytes, to_hex};
use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Directory under the system temp dir that holds lock files.
#[must_use]
pub fn default_locks_dir() -> PathBuf {
    std::env::temp_dir().join("mirrorsync-locks")
}

/// Holds an exclusive lock on a replica root for the duration of one pass
///
/// The lock file lives outside the replica so the prune phase never sees it.
/// It is deliberately left on disk after release: deleting it could let a
/// second process lock a fresh inode while a third still holds the old one.
pub struct PassLock {
    /// Lock file handle
    lock_file: File,
    /// Path to the lock file (for error messages)
    lock_path: PathBuf,
}

impl PassLock {
    /// Lock file path for a replica root, keyed by a digest of its canonical path.
    #[must_use]
    pub fn lock_path(locks_dir: &Path, replica_root: &Path) -> PathBuf {
        let canonical = replica_root
            .canonicalize()
            .unwrap_or_else(|_| replica_root.to_path_buf());
        let digest = to_hex(hash_bytes(canonical.as_os_str().as_encoded_bytes()));
        locks_dir.join(format!("{}.lock", &digest[..16]))
    }

    /// Try to take the lock without waiting
    ///
    /// Returns `Ok(None)` if another process currently holds it.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Cannot create locks directory
    /// - Cannot create or open the lock file
    pub fn try_acquire(locks_dir: &Path, replica_root: &Path) -> Result<Option<Self>> {
        fs::create_dir_all(locks_dir).with_context(|| {
            format!("Failed to create locks directory: {}", locks_dir.display())
        })?;

        let lock_path = Self::lock_path(locks_dir, replica_root);

        // No truncation before the lock is held: the current holder's info stays readable
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to create lock file: {}", lock_path.display()))?;

        match lock_file.try_lock_exclusive() {
            Ok(true) => {}
            Ok(false) | Err(_) => return Ok(None),
        }

        let lock = Self {
            lock_file,
            lock_path,
        };
        lock.write_owner_info(replica_root);
        Ok(Some(lock))
    }

    /// Record who holds the lock, for debugging stuck locks
    fn write_owner_info(&self, replica_root: &Path) {
        let mut file_ref = &self.lock_file;
        let _ = file_ref.set_len(0);
        let _ = writeln!(
            file_ref,
            "replica={}\npid={}\ntime={}",
            replica_root.display(),
            std::process::id(),
            humantime::format_rfc3339(SystemTime::now())
        );
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for PassLock {
    fn drop(&mut self) {
        // Unlock file (happens automatically on close, but being explicit)
        let _ = FileExt::unlock(&self.lock_file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_and_release() {
        let temp = TempDir::new().unwrap();
        let locks = temp.path().join("locks");

        let lock = PassLock::try_acquire(&locks, temp.path()).unwrap().unwrap();
        assert!(lock.path().exists());
        let info = fs::read_to_string(lock.path()).unwrap();
        assert!(info.contains(&format!("pid={}", std::process::id())));
        drop(lock);

        assert!(PassLock::try_acquire(&locks, temp.path()).unwrap().is_some());
    }

    #[test]
    fn test_second_lock_on_same_replica_is_refused() {
        let temp = TempDir::new().unwrap();
        let locks = temp.path().join("locks");

        let _held = PassLock::try_acquire(&locks, temp.path()).unwrap().unwrap();
        assert!(PassLock::try_acquire(&locks, temp.path()).unwrap().is_none());
    }

    #[test]
    fn test_different_replicas_lock_independently() {
        let temp = TempDir::new().unwrap();
        let locks = temp.path().join("locks");
        let a = temp.path().join("a");
        let b = temp.path().join("b");
        fs::create_dir(&a).unwrap();
        fs::create_dir(&b).unwrap();

        let _lock_a = PassLock::try_acquire(&locks, &a).unwrap().unwrap();
        assert!(PassLock::try_acquire(&locks, &b).unwrap().is_some());
    }
}
