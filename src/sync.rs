//! # Tree Reconciliation
//!
//! One synchronization pass makes the replica tree an exact copy of the source
//! tree. A pass runs in two strictly ordered phases:
//!
//! ```text
//!  Phase A: propagate (pre-order over source)      Phase B: prune (post-order over replica)
//!  ┌──────────────────────────────────────┐        ┌─────────────────────────────────────┐
//!  │ dir  -> create replica dir if absent │        │ file not in snapshot -> remove_file │
//!  │ file -> create / compare / replace   │  --->  │ dir  not in snapshot -> remove_dir  │
//!  │ every mapped path -> SourceSnapshot  │        │ (children always before parents)    │
//!  └──────────────────────────────────────┘        └─────────────────────────────────────┘
//! ```
//!
//! Phase B only starts once the snapshot is complete. Deletion decisions made
//! against a partial snapshot would delete replica files whose source
//! counterparts simply had not been visited yet.
//!
//! ## Failure containment
//!
//! Every node is handled independently. A read failure, write failure or a
//! directory that refuses to be removed becomes an [`EventKind::Error`] event
//! and the walk moves on. If a source directory cannot be listed, its replica
//! counterpart is protected from pruning for the rest of the pass.
//!
//! ## Type changes
//!
//! - Source directory where the replica has a file: the file is deleted and the
//!   directory created during Phase A.
//! - Source file where the replica has a directory: the copy is deferred until
//!   after Phase B has pruned that directory, then retried once.

use crate::utils::hash::files_equal;
use crate::utils::paths::PathMapping;
use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{Level, debug, error, info, span};
use walkdir::{DirEntry, WalkDir};

/// Atomic full-file replace
pub mod copy;
/// Structured pass events and the pass result
pub mod events;
/// Set of replica paths that must survive pruning
pub mod snapshot;

pub use events::{EventKind, PassResult, SyncEvent};
pub use snapshot::SourceSnapshot;

/// Runs one complete synchronization pass from `source_root` into `replica_root`.
///
/// Both roots must already exist as directories (see
/// [`crate::config::validator::prepare_roots`]). Per-node failures never abort
/// the pass; they are returned as error events in the [`PassResult`].
#[must_use]
pub fn synchronize(source_root: &Path, replica_root: &Path) -> PassResult {
    Reconciler::new(source_root, replica_root).run()
}

/// What currently occupies a replica path
enum ReplicaNode {
    /// Nothing
    Missing,
    /// A regular file
    File,
    /// A symlink; always replaced by a plain copy
    Link,
    /// A directory
    Dir,
}

impl ReplicaNode {
    /// Inspects `path` without following symlinks.
    fn inspect(path: &Path) -> Result<Self> {
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => Ok(Self::Dir),
            Ok(meta) if meta.file_type().is_symlink() => Ok(Self::Link),
            Ok(_) => Ok(Self::File),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::Missing),
            Err(e) => Err(e).with_context(|| format!("Failed to stat {}", path.display())),
        }
    }
}

/// State of a single pass. Consumed by [`Reconciler::run`].
pub struct Reconciler {
    /// Source-to-replica path mapping
    mapping: PathMapping,
    /// Paths the prune phase must keep
    snapshot: SourceSnapshot,
    /// Files blocked by a replica directory, retried after pruning
    deferred: Vec<(PathBuf, PathBuf)>,
    /// Accumulated events
    result: PassResult,
}

impl Reconciler {
    /// Prepares a pass between two roots.
    #[must_use]
    pub fn new(source_root: &Path, replica_root: &Path) -> Self {
        Self {
            mapping: PathMapping::new(source_root, replica_root),
            snapshot: SourceSnapshot::new(),
            deferred: Vec::new(),
            result: PassResult::default(),
        }
    }

    /// Executes propagate, then prune, then the deferred retries.
    #[must_use]
    pub fn run(mut self) -> PassResult {
        let span = span!(
            Level::INFO,
            "pass",
            source = %self.mapping.source_root().display(),
            replica = %self.mapping.replica_root().display()
        );
        let _guard = span.enter();
        let start = Instant::now();

        self.propagate();
        self.prune();
        self.settle_deferred();

        self.result.duration = start.elapsed();
        self.log_summary();
        self.result
    }

    /// Records an event and emits it to the log.
    fn record(&mut self, event: SyncEvent) {
        if event.kind == EventKind::Error {
            error!(
                kind = %event.kind,
                path = %event.path.display(),
                cause = event.cause.as_deref().unwrap_or_default(),
                "{event}"
            );
        } else {
            info!(kind = %event.kind, path = %event.path.display(), "{event}");
        }
        self.result.events.push(event);
    }

    /// Records a node-level failure.
    fn fail(&mut self, path: &Path, err: &anyhow::Error) {
        self.record(SyncEvent::error(path, err));
    }

    /// Phase A: walk the source pre-order, creating directories, syncing files
    /// and filling the snapshot.
    fn propagate(&mut self) {
        let span = span!(Level::DEBUG, "propagate");
        let _guard = span.enter();

        self.snapshot
            .insert_dir(self.mapping.replica_root().to_path_buf());

        let walker = WalkDir::new(self.mapping.source_root())
            .follow_links(false)
            .sort_by_file_name();

        for entry in walker {
            match entry {
                Ok(entry) => self.propagate_entry(&entry),
                Err(err) => self.source_unreadable(&err),
            }
        }

        debug!(
            dirs = self.snapshot.dir_count(),
            files = self.snapshot.file_count(),
            "Source snapshot complete"
        );
    }

    /// Handles one source entry.
    fn propagate_entry(&mut self, entry: &DirEntry) {
        let source_path = entry.path();
        let replica_path = match self.mapping.to_replica(source_path) {
            Ok(path) => path,
            Err(e) => return self.fail(source_path, &e),
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            self.snapshot.insert_dir(replica_path.clone());
            if let Err(e) = self.ensure_dir(&replica_path) {
                self.fail(&replica_path, &e);
            }
        } else if file_type.is_file() {
            self.snapshot.insert_file(replica_path.clone());
            self.sync_file(source_path, &replica_path, true);
        } else if file_type.is_symlink() {
            // Plain copy semantics: a link to a file is mirrored as that file's content.
            match fs::metadata(source_path) {
                Ok(meta) if meta.is_file() => {
                    self.snapshot.insert_file(replica_path.clone());
                    self.sync_file(source_path, &replica_path, true);
                }
                Ok(_) => debug!(path = %source_path.display(), "Skipping symlink to directory"),
                Err(e) => debug!(path = %source_path.display(), error = %e, "Skipping dangling symlink"),
            }
        } else {
            debug!(path = %source_path.display(), "Skipping special file");
        }
    }

    /// A source directory (or the root) could not be listed. Nothing under its
    /// replica counterpart may be pruned this pass.
    fn source_unreadable(&mut self, err: &walkdir::Error) {
        let cause = anyhow::anyhow!("{err}").context("Failed to read source directory");
        let protected = err
            .path()
            .and_then(|p| self.mapping.to_replica(p).ok())
            .unwrap_or_else(|| self.mapping.replica_root().to_path_buf());

        let reported = err.path().unwrap_or_else(|| self.mapping.source_root());
        let reported = reported.to_path_buf();
        self.snapshot.protect(protected);
        self.fail(&reported, &cause);
    }

    /// Makes sure `dir` exists as a directory in the replica.
    ///
    /// A file or symlink squatting on the path is deleted first. A directory
    /// that appears between the check and `create_dir` counts as success.
    fn ensure_dir(&mut self, dir: &Path) -> Result<()> {
        match ReplicaNode::inspect(dir)? {
            ReplicaNode::Dir => return Ok(()),
            ReplicaNode::File | ReplicaNode::Link => {
                fs::remove_file(dir)
                    .with_context(|| format!("Failed to delete file in the way of {}", dir.display()))?;
                self.record(SyncEvent::new(EventKind::FileDeleted, dir));
            }
            ReplicaNode::Missing => {}
        }

        match fs::create_dir(dir) {
            Ok(()) => {
                self.record(SyncEvent::new(EventKind::DirCreated, dir));
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to create directory {}", dir.display())),
        }
    }

    /// Brings one replica file in line with its source.
    ///
    /// With `defer` set, a directory occupying `dst` postpones the copy until
    /// after pruning instead of failing.
    fn sync_file(&mut self, src: &Path, dst: &Path, defer: bool) {
        let node = match ReplicaNode::inspect(dst) {
            Ok(node) => node,
            Err(e) => return self.fail(dst, &e),
        };

        let kind = match node {
            ReplicaNode::Missing => EventKind::FileCreated,
            ReplicaNode::Link => EventKind::FileUpdated,
            ReplicaNode::File => match files_equal(src, dst) {
                Ok(true) => return,
                Ok(false) => EventKind::FileUpdated,
                Err(e) => return self.fail(dst, &e.context("Failed to compare with source")),
            },
            ReplicaNode::Dir if defer => {
                debug!(path = %dst.display(), "Replica has a directory where the source has a file, deferring");
                self.deferred.push((src.to_path_buf(), dst.to_path_buf()));
                return;
            }
            ReplicaNode::Dir => {
                let e = anyhow::anyhow!("replica path is a directory that could not be pruned");
                return self.fail(dst, &e);
            }
        };

        match copy::replace_file(src, dst) {
            Ok(bytes) => {
                self.result.bytes_copied += bytes;
                self.record(SyncEvent::new(kind, dst));
            }
            Err(e) => self.fail(dst, &e),
        }
    }

    /// Phase B: walk the replica post-order and delete what the snapshot does not keep.
    fn prune(&mut self) {
        let span = span!(Level::DEBUG, "prune");
        let _guard = span.enter();

        let walker = WalkDir::new(self.mapping.replica_root())
            .follow_links(false)
            .contents_first(true)
            .sort_by_file_name();

        for entry in walker {
            match entry {
                Ok(entry) => self.prune_entry(&entry),
                Err(err) => {
                    let path = err
                        .path()
                        .unwrap_or_else(|| self.mapping.replica_root())
                        .to_path_buf();
                    let cause = anyhow::anyhow!("{err}").context("Failed to read replica directory");
                    self.fail(&path, &cause);
                }
            }
        }
    }

    /// Handles one replica entry. Children are always seen before their parent.
    fn prune_entry(&mut self, entry: &DirEntry) {
        // The replica root itself is never removed.
        if entry.depth() == 0 {
            return;
        }

        let path = entry.path();
        if entry.file_type().is_dir() {
            if self.snapshot.keeps_dir(path) {
                return;
            }
            // Non-recursive on purpose: unexpected content must fail loudly.
            match fs::remove_dir(path) {
                Ok(()) => self.record(SyncEvent::new(EventKind::DirRemoved, path)),
                Err(e) => {
                    let e = anyhow::Error::new(e)
                        .context(format!("Failed to remove directory {}", path.display()));
                    self.fail(path, &e);
                }
            }
        } else {
            if self.snapshot.keeps_file(path) {
                return;
            }
            match fs::remove_file(path) {
                Ok(()) => self.record(SyncEvent::new(EventKind::FileDeleted, path)),
                Err(e) => {
                    let e = anyhow::Error::new(e)
                        .context(format!("Failed to delete file {}", path.display()));
                    self.fail(path, &e);
                }
            }
        }
    }

    /// Retries files that were blocked by a replica directory during propagate.
    fn settle_deferred(&mut self) {
        for (src, dst) in std::mem::take(&mut self.deferred) {
            self.sync_file(&src, &dst, false);
        }
    }

    /// Logs a one-line summary of the pass.
    fn log_summary(&self) {
        let r = &self.result;
        if r.is_noop() {
            debug!(duration = ?r.duration, "Pass complete, replica already in sync");
            return;
        }
        info!(
            dirs_created = r.count(EventKind::DirCreated),
            files_created = r.count(EventKind::FileCreated),
            files_updated = r.count(EventKind::FileUpdated),
            files_deleted = r.count(EventKind::FileDeleted),
            dirs_removed = r.count(EventKind::DirRemoved),
            errors = r.count(EventKind::Error),
            bytes = r.bytes_copied,
            duration = ?r.duration,
            "Pass complete"
        );
    }
}
