//! In-memory backend that records every watch request.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use super::WatchBackend;
use crate::error::WatchError;

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum BackendCall {
    Add(PathBuf),
    Remove(PathBuf),
}

#[derive(Debug, Default)]
struct RecordingState {
    calls: Vec<BackendCall>,
    active: BTreeSet<PathBuf>,
    rejected: BTreeSet<PathBuf>,
}

/// Clones share state, so a test keeps one clone and hands the other out.
#[derive(Clone, Debug, Default)]
pub(crate) struct RecordingBackend {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Makes every later `add_watch` for `path` fail.
    pub(crate) fn reject(&self, path: impl Into<PathBuf>) {
        self.lock().rejected.insert(path.into());
    }

    pub(crate) fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    pub(crate) fn active(&self) -> Vec<PathBuf> {
        self.lock().active.iter().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WatchBackend for RecordingBackend {
    fn add_watch(&mut self, path: &Path) -> Result<(), WatchError> {
        let mut state = self.lock();
        state.calls.push(BackendCall::Add(path.to_path_buf()));
        if state.rejected.contains(path) {
            return Err(WatchError::Add {
                path: path.to_path_buf(),
                source: notify::Error::generic("watch rejected"),
            });
        }
        state.active.insert(path.to_path_buf());
        Ok(())
    }

    fn remove_watch(&mut self, path: &Path) -> Result<(), WatchError> {
        let mut state = self.lock();
        state.calls.push(BackendCall::Remove(path.to_path_buf()));
        state.active.remove(path);
        Ok(())
    }
}
