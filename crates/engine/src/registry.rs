//! Bookkeeping for live directory watches.
//!
//! The registry is the only way a directory becomes live or stops being live.
//! It holds no event logic: it records which directories are watched and
//! forwards add and remove requests to its [`WatchBackend`].

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use logging::trace_watch;

use crate::backend::WatchBackend;
use crate::error::WatchError;

/// Record of one active watch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WatchHandle {
    id: u64,
    path: PathBuf,
    registered_at: Instant,
}

impl WatchHandle {
    /// Registration sequence number, unique for the registry's lifetime.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Watched directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the watch became active.
    #[must_use]
    pub const fn registered_at(&self) -> Instant {
        self.registered_at
    }
}

/// Map of watched directory to its [`WatchHandle`].
///
/// A path is a key exactly when the backend holds an active watch for it.
pub struct WatchRegistry {
    backend: Box<dyn WatchBackend>,
    watches: BTreeMap<PathBuf, WatchHandle>,
    next_id: u64,
}

impl WatchRegistry {
    /// Creates an empty registry over `backend`.
    pub fn new(backend: Box<dyn WatchBackend>) -> Self {
        Self {
            backend,
            watches: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Watches `dir`. Registering a directory twice returns the existing handle.
    pub fn register(&mut self, dir: &Path) -> Result<&WatchHandle, WatchError> {
        match self.watches.entry(dir.to_path_buf()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                self.backend.add_watch(dir)?;
                let handle = WatchHandle {
                    id: self.next_id,
                    path: dir.to_path_buf(),
                    registered_at: Instant::now(),
                };
                self.next_id += 1;
                trace_watch!(id = handle.id, "watching {}", dir.display());
                Ok(entry.insert(handle))
            }
        }
    }

    /// Stops watching `dir`. Returns whether it was registered.
    ///
    /// The entry is dropped even when the backend fails to release the watch;
    /// the failure is returned for reporting.
    pub fn unregister(&mut self, dir: &Path) -> Result<bool, WatchError> {
        if self.watches.remove(dir).is_none() {
            return Ok(false);
        }
        trace_watch!("unwatching {}", dir.display());
        self.backend.remove_watch(dir).map(|()| true)
    }

    /// Stops watching `dir` and every watched directory below it, deepest first.
    ///
    /// Returns the number of watches dropped and any release failures.
    pub fn unregister_subtree(&mut self, dir: &Path) -> (usize, Vec<WatchError>) {
        let doomed: Vec<PathBuf> = self
            .watches
            .range(dir.to_path_buf()..)
            .map(|(path, _)| path)
            .take_while(|path| path.starts_with(dir))
            .cloned()
            .collect();

        let mut failures = Vec::new();
        for path in doomed.iter().rev() {
            if let Err(error) = self.unregister(path) {
                failures.push(error);
            }
        }
        (doomed.len(), failures)
    }

    /// Reports whether `dir` is watched.
    #[must_use]
    pub fn contains(&self, dir: &Path) -> bool {
        self.watches.contains_key(dir)
    }

    /// Returns the handle for `dir`, if watched.
    #[must_use]
    pub fn get(&self, dir: &Path) -> Option<&WatchHandle> {
        self.watches.get(dir)
    }

    /// Watched directories in lexical order (every parent precedes its children).
    #[must_use]
    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.watches.keys().cloned().collect()
    }

    /// Number of watched directories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.watches.len()
    }

    /// Reports whether nothing is watched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    /// Releases every watch in reverse snapshot order and then the backend.
    ///
    /// Returns the release failures; the watches are forgotten regardless.
    pub fn teardown(mut self) -> Vec<WatchError> {
        let mut failures = Vec::new();
        for path in self.snapshot().iter().rev() {
            if let Err(error) = self.unregister(path) {
                failures.push(error);
            }
        }
        trace_watch!("watch mechanism released");
        failures
    }
}

impl fmt::Debug for WatchRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRegistry")
            .field("watches", &self.watches.keys().collect::<Vec<_>>())
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}
