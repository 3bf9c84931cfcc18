//! Error taxonomy for the watch-and-mirror engine.
//!
//! Construction and start-time failures propagate to the caller. Per-event
//! failures ([`MirrorError`], [`WatchError`] raised while dispatching) are
//! reported through the output sink and never stop the dispatcher.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use walk::WalkError;

/// A path could not be resolved or related to one of the agent roots.
#[derive(Debug, thiserror::Error)]
pub enum PathResolutionError {
    /// The path is missing, unreadable or part of a symlink cycle.
    #[error("failed to resolve '{path}': {source}")]
    Resolve {
        /// Path handed to the resolver.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        #[source]
        source: io::Error,
    },
    /// `target` does not live below `base`.
    #[error("'{target}' is not inside '{base}'")]
    Unreachable {
        /// Root the path was expected under.
        base: PathBuf,
        /// Path that escaped the root.
        target: PathBuf,
    },
}

impl PathResolutionError {
    pub(crate) fn resolve(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Resolve {
            path: path.into(),
            source,
        }
    }
}

/// Agent roots failed validation; the agent was never created.
#[derive(Debug, thiserror::Error)]
pub enum ConstructionError {
    /// A root could not be resolved to an absolute, symlink-free path.
    #[error(transparent)]
    Resolution(#[from] PathResolutionError),
    /// A root exists but is not a directory.
    #[error("'{0}' is not a directory")]
    NotADirectory(PathBuf),
    /// Source and destination resolve to the same directory.
    #[error("source and destination both resolve to '{0}'")]
    SameRoot(PathBuf),
    /// One root lives inside the other.
    #[error("'{inner}' is nested inside '{outer}'")]
    NestedRoots {
        /// Enclosing root.
        outer: PathBuf,
        /// Root found below `outer`.
        inner: PathBuf,
    },
}

/// Filesystem step that failed while mirroring a path.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MirrorAction {
    /// Reading metadata.
    Inspect,
    /// Creating a destination directory.
    CreateDir,
    /// Opening the source file.
    Open,
    /// Creating or truncating the destination file.
    Create,
    /// Copying file contents.
    Copy,
    /// Flushing the destination file to durable storage.
    Sync,
    /// Copying permission bits.
    SetPermissions,
    /// Removing a destination entry.
    Remove,
}

impl fmt::Display for MirrorAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Self::Inspect => "inspect",
            Self::CreateDir => "create directory",
            Self::Open => "open",
            Self::Create => "create",
            Self::Copy => "copy into",
            Self::Sync => "sync",
            Self::SetPermissions => "set permissions on",
            Self::Remove => "remove",
        };
        f.write_str(verb)
    }
}

/// A single mirror operation failed. Logged and skipped by the dispatcher.
#[derive(Debug, thiserror::Error)]
#[error("failed to {action} '{path}': {source}")]
pub struct MirrorError {
    action: MirrorAction,
    path: PathBuf,
    #[source]
    source: io::Error,
}

impl MirrorError {
    pub(crate) fn new(action: MirrorAction, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            action,
            path: path.into(),
            source,
        }
    }

    /// Returns the step that failed.
    #[must_use]
    pub const fn action(&self) -> MirrorAction {
        self.action
    }

    /// Returns the path the step operated on.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reports whether the source vanished before it could be read.
    ///
    /// Only the source-side steps qualify. A missing path on the destination
    /// side (for example an absent parent directory) is a real failure.
    #[must_use]
    pub fn source_vanished(&self) -> bool {
        matches!(self.action, MirrorAction::Open | MirrorAction::Inspect)
            && self.source.kind() == io::ErrorKind::NotFound
    }
}

/// The watch mechanism rejected a request.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The mechanism itself could not be initialised.
    #[error("failed to initialise the watch mechanism: {0}")]
    Init(#[source] notify::Error),
    /// A directory could not be watched.
    #[error("failed to watch '{path}': {source}")]
    Add {
        /// Directory the watch was requested for.
        path: PathBuf,
        /// Error reported by the mechanism.
        #[source]
        source: notify::Error,
    },
    /// A watch could not be released.
    #[error("failed to unwatch '{path}': {source}")]
    Remove {
        /// Directory whose watch was being released.
        path: PathBuf,
        /// Error reported by the mechanism.
        #[source]
        source: notify::Error,
    },
}

impl WatchError {
    /// Returns the directory involved, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Init(_) => None,
            Self::Add { path, .. } | Self::Remove { path, .. } => Some(path),
        }
    }
}

/// [`WatchAgent::start`](crate::WatchAgent::start) failed; nothing is being watched.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    /// The agent is already running.
    #[error("agent is already running")]
    AlreadyRunning,
    /// The agent has been stopped and cannot be restarted.
    #[error("agent has been stopped")]
    Stopped,
    /// The watch mechanism failed to initialise or to watch a directory.
    #[error(transparent)]
    Watch(#[from] WatchError),
    /// A root could not be listed.
    #[error(transparent)]
    Walk(#[from] WalkError),
    /// The dispatcher thread could not be spawned.
    #[error("failed to spawn the dispatcher thread: {0}")]
    Spawn(#[source] io::Error),
}

/// [`WatchAgent::stop`](crate::WatchAgent::stop) could not shut down cleanly.
#[derive(Debug, thiserror::Error)]
pub enum StopError {
    /// The dispatcher thread panicked; its watches were released on unwind.
    #[error("dispatcher thread panicked")]
    DispatcherPanicked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_error_display_names_action_and_path() {
        let error = MirrorError::new(
            MirrorAction::Copy,
            "/dest/a.txt",
            io::Error::other("disk full"),
        );
        assert_eq!(
            error.to_string(),
            "failed to copy into '/dest/a.txt': disk full"
        );
        assert_eq!(error.action(), MirrorAction::Copy);
        assert_eq!(error.path(), Path::new("/dest/a.txt"));
        assert!(!error.source_vanished());
    }

    #[test]
    fn mirror_error_detects_vanished_sources() {
        let error = MirrorError::new(
            MirrorAction::Open,
            "/src/gone",
            io::Error::from(io::ErrorKind::NotFound),
        );
        assert!(error.source_vanished());
    }

    #[test]
    fn missing_destination_parent_is_not_a_vanished_source() {
        let error = MirrorError::new(
            MirrorAction::Create,
            "/dest/absent/b.txt",
            io::Error::from(io::ErrorKind::NotFound),
        );
        assert!(!error.source_vanished());
    }

    #[test]
    fn construction_error_messages() {
        let same = ConstructionError::SameRoot(PathBuf::from("/data"));
        assert_eq!(
            same.to_string(),
            "source and destination both resolve to '/data'"
        );

        let nested = ConstructionError::NestedRoots {
            outer: PathBuf::from("/data"),
            inner: PathBuf::from("/data/mirror"),
        };
        assert!(nested.to_string().contains("/data/mirror"));
    }

    #[test]
    fn watch_error_exposes_path() {
        let error = WatchError::Add {
            path: PathBuf::from("/src/a"),
            source: notify::Error::generic("too many watches"),
        };
        assert_eq!(error.path(), Some(Path::new("/src/a")));
        assert!(error.to_string().contains("too many watches"));

        let init = WatchError::Init(notify::Error::generic("no inotify"));
        assert!(init.path().is_none());
    }
}
