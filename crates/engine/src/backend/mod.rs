//! Seam between the watch registry and the OS notification service.
//!
//! A [`WatchBackend`] adds and removes per-directory watches. Notifications
//! for every watched directory arrive on one shared pair of channels
//! ([`Notifications`]): one for events, one for errors reported by the
//! mechanism. [`WatchMechanism`] bundles a backend with the receiving end of
//! its channels so the agent can own both and release them together.

use std::fmt;
use std::path::Path;

use crossbeam_channel::{Receiver, Sender};

use crate::error::WatchError;

mod notify_backend;
#[cfg(test)]
pub(crate) mod recording;

pub use notify_backend::NotifyBackend;

/// Adds and removes non-recursive directory watches.
pub trait WatchBackend: Send {
    /// Starts delivering notifications for the direct contents of `path`.
    fn add_watch(&mut self, path: &Path) -> Result<(), WatchError>;

    /// Stops delivering notifications for `path`.
    ///
    /// Releasing a watch the OS already dropped (because the directory was
    /// deleted) succeeds.
    fn remove_watch(&mut self, path: &Path) -> Result<(), WatchError>;
}

impl<B> WatchBackend for Box<B>
where
    B: WatchBackend + ?Sized,
{
    fn add_watch(&mut self, path: &Path) -> Result<(), WatchError> {
        (**self).add_watch(path)
    }

    fn remove_watch(&mut self, path: &Path) -> Result<(), WatchError> {
        (**self).remove_watch(path)
    }
}

/// Receiving half of the shared notification stream.
#[derive(Debug)]
pub struct Notifications {
    /// Change notifications for every watched directory.
    pub events: Receiver<notify::Event>,
    /// Errors raised by the mechanism, such as queue overflow.
    pub errors: Receiver<notify::Error>,
}

/// Sending half of the shared notification stream.
#[derive(Clone, Debug)]
pub struct NotificationSenders {
    /// Sender for change notifications.
    pub events: Sender<notify::Event>,
    /// Sender for mechanism errors.
    pub errors: Sender<notify::Error>,
}

impl Notifications {
    /// Creates an unbounded notification stream.
    #[must_use]
    pub fn unbounded() -> (NotificationSenders, Self) {
        let (event_tx, events) = crossbeam_channel::unbounded();
        let (error_tx, errors) = crossbeam_channel::unbounded();
        (
            NotificationSenders {
                events: event_tx,
                errors: error_tx,
            },
            Self { events, errors },
        )
    }
}

/// A watch backend together with the stream it feeds.
pub struct WatchMechanism {
    backend: Box<dyn WatchBackend>,
    notifications: Notifications,
}

impl WatchMechanism {
    /// Pairs a custom backend with the stream it delivers into.
    pub fn new<B>(backend: B, notifications: Notifications) -> Self
    where
        B: WatchBackend + 'static,
    {
        Self {
            backend: Box::new(backend),
            notifications,
        }
    }

    /// Opens the platform's recommended `notify` watcher.
    pub fn open() -> Result<Self, WatchError> {
        let (backend, notifications) = NotifyBackend::open()?;
        Ok(Self::new(backend, notifications))
    }

    pub(crate) fn into_parts(self) -> (Box<dyn WatchBackend>, Notifications) {
        (self.backend, self.notifications)
    }
}

impl fmt::Debug for WatchMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchMechanism")
            .field("notifications", &self.notifications)
            .finish_non_exhaustive()
    }
}
