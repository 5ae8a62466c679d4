use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Kind of action recorded during a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A directory was created in the replica
    DirCreated,
    /// A file was copied into the replica for the first time
    FileCreated,
    /// A replica file was replaced with different source content
    FileUpdated,
    /// A replica file absent from the source was deleted
    FileDeleted,
    /// A replica directory absent from the source was removed
    DirRemoved,
    /// A node could not be synchronized this pass
    Error,
}

impl EventKind {
    /// Stable machine-readable name, also used as the `kind` log field
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DirCreated => "dir-created",
            Self::FileCreated => "file-created",
            Self::FileUpdated => "file-updated",
            Self::FileDeleted => "file-deleted",
            Self::DirRemoved => "dir-removed",
            Self::Error => "error",
        }
    }

    /// Whether this kind represents a filesystem mutation
    #[must_use]
    pub const fn is_mutation(self) -> bool {
        !matches!(self, Self::Error)
    }

    /// Human-readable verb for log lines
    const fn verb(self) -> &'static str {
        match self {
            Self::DirCreated => "Created directory",
            Self::FileCreated => "Created file",
            Self::FileUpdated => "Updated file",
            Self::FileDeleted => "Deleted file",
            Self::DirRemoved => "Removed directory",
            Self::Error => "Failed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured event: a mutating action or a node-level failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEvent {
    /// What happened
    pub kind: EventKind,
    /// Absolute path of the node involved
    pub path: PathBuf,
    /// Human-readable cause, present only for [`EventKind::Error`]
    pub cause: Option<String>,
}

impl SyncEvent {
    /// Creates a mutation event.
    #[must_use]
    pub fn new(kind: EventKind, path: &Path) -> Self {
        Self {
            kind,
            path: path.to_path_buf(),
            cause: None,
        }
    }

    /// Creates an error event, flattening the full `anyhow` context chain into the cause.
    #[must_use]
    pub fn error(path: &Path, err: &anyhow::Error) -> Self {
        Self {
            kind: EventKind::Error,
            path: path.to_path_buf(),
            cause: Some(format!("{err:#}")),
        }
    }
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.verb(), self.path.display())?;
        if let Some(cause) = &self.cause {
            write!(f, " ({cause})")?;
        }
        Ok(())
    }
}

/// Outcome of one synchronization pass
#[derive(Debug, Clone, Default)]
pub struct PassResult {
    /// Events in the order they happened
    pub events: Vec<SyncEvent>,
    /// Bytes written into the replica by creates and updates
    pub bytes_copied: u64,
    /// Wall-clock duration of the pass
    pub duration: Duration,
}

impl PassResult {
    /// Number of events of the given kind.
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    /// Number of filesystem mutations performed.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.events.iter().filter(|e| e.kind.is_mutation()).count()
    }

    /// Whether at least one node failed to synchronize.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.events.iter().any(|e| e.kind == EventKind::Error)
    }

    /// Whether the pass changed nothing and hit no errors.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterates over error events only.
    pub fn errors(&self) -> impl Iterator<Item = &SyncEvent> {
        self.events.iter().filter(|e| e.kind == EventKind::Error)
    }
}
