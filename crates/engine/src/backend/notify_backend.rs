use std::fmt;
use std::io;
use std::path::Path;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use super::{Notifications, WatchBackend};
use crate::error::WatchError;

/// [`WatchBackend`] over the platform's recommended `notify` watcher.
///
/// Each directory is watched non-recursively; recursion is driven by the
/// registry so that every live directory has exactly one registration.
pub struct NotifyBackend {
    watcher: RecommendedWatcher,
}

impl NotifyBackend {
    /// Opens the watcher and the notification stream it feeds.
    ///
    /// notify hands every result to one callback; successes go to the event
    /// channel and failures to the error channel.
    pub fn open() -> Result<(Self, Notifications), WatchError> {
        let (senders, notifications) = Notifications::unbounded();
        let watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
            match result {
                Ok(event) => {
                    let _ = senders.events.send(event);
                }
                Err(error) => {
                    let _ = senders.errors.send(error);
                }
            }
        })
        .map_err(WatchError::Init)?;

        Ok((Self { watcher }, notifications))
    }
}

impl WatchBackend for NotifyBackend {
    fn add_watch(&mut self, path: &Path) -> Result<(), WatchError> {
        self.watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Add {
                path: path.to_path_buf(),
                source,
            })
    }

    fn remove_watch(&mut self, path: &Path) -> Result<(), WatchError> {
        match self.watcher.unwatch(path) {
            Ok(()) => Ok(()),
            Err(error) if watch_already_gone(&error) => Ok(()),
            Err(source) => Err(WatchError::Remove {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

impl fmt::Debug for NotifyBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyBackend").finish_non_exhaustive()
    }
}

/// The kernel drops a watch when its directory is deleted; unwatching it
/// afterwards reports one of these.
fn watch_already_gone(error: &notify::Error) -> bool {
    match &error.kind {
        notify::ErrorKind::WatchNotFound | notify::ErrorKind::PathNotFound => true,
        notify::ErrorKind::Io(io_error) => matches!(
            io_error.kind(),
            io::ErrorKind::NotFound | io::ErrorKind::InvalidInput
        ),
        _ => false,
    }
}
