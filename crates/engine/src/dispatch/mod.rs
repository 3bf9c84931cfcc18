//! The single consumer of the shared notification stream.
//!
//! Every watched directory reports into one channel, so exactly one
//! [`Dispatcher`] reads it for the agent's whole lifetime and routes each
//! event by path. Events are handled strictly in delivery order; a failure
//! while handling one event is reported through the sink and never ends the
//! loop.
//!
//! The transition for an event depends on its kind and on what the source
//! path is when the event is handled (it may have changed since the
//! notification was raised):
//!
//! | event | source is a directory | source is a file | source is missing |
//! |---|---|---|---|
//! | create | mirror, watch and seed the directory | copy | ignore |
//! | write | ignore | copy | delete and unwatch |
//! | remove | ignore | delete | delete and unwatch |
//! | rename away | ignore | ignore | delete and unwatch |
//! | chmod | ignore | ignore | ignore |

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, Sender, never, select};
use logging::{SharedSink, trace_dispatch};

use crate::backend::Notifications;
use crate::event::{MirrorEvent, MirrorEventKind, classify};
use crate::mirror::TreeMirror;
use crate::options::AgentOptions;
use crate::paths::PathTranslator;
use crate::registry::WatchRegistry;

mod reconcile;

pub use reconcile::ReconcileSummary;
pub(crate) use reconcile::WatchFailurePolicy;

/// Requests sent from the agent to its running dispatcher.
pub(crate) enum Control {
    /// Leave the loop and hand the registry back.
    Stop,
    /// Reply with the watched directories.
    Snapshot(Sender<Vec<PathBuf>>),
    /// Reply with the running counters.
    Stats(Sender<DispatchStats>),
}

/// Action chosen for one event.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decision {
    /// A destination directory was created (and, when recursive, watched and seeded).
    CreateDir,
    /// A file was copied.
    CopyFile,
    /// A destination path was deleted and any watches below it dropped.
    Delete,
    /// Nothing to do.
    Ignore,
}

/// Counters maintained by the dispatcher.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DispatchStats {
    /// Raw notifications read off the stream.
    pub notifications: u64,
    /// Mirror events produced by classification.
    pub events: u64,
    /// Events that created a directory.
    pub directories_created: u64,
    /// Events that copied a file.
    pub files_copied: u64,
    /// Events that deleted a destination path.
    pub paths_deleted: u64,
    /// Events that required no action.
    pub ignored: u64,
    /// Errors reported through the sink.
    pub errors: u64,
    /// Reconciliation walks triggered by overflow.
    pub rescans: u64,
}

impl DispatchStats {
    /// Total decisions taken; equals [`events`](Self::events).
    #[must_use]
    pub const fn decisions(&self) -> u64 {
        self.directories_created + self.files_copied + self.paths_deleted + self.ignored
    }

    fn record(&mut self, decision: Decision) {
        match decision {
            Decision::CreateDir => self.directories_created += 1,
            Decision::CopyFile => self.files_copied += 1,
            Decision::Delete => self.paths_deleted += 1,
            Decision::Ignore => self.ignored += 1,
        }
    }
}

/// What the source path is at handling time.
enum SourceState {
    Directory,
    File,
    Missing,
}

/// Applies events to the destination tree and keeps the registry current.
pub(crate) struct Dispatcher {
    translator: PathTranslator,
    mirror: TreeMirror,
    registry: WatchRegistry,
    options: AgentOptions,
    sink: SharedSink,
    stats: DispatchStats,
}

impl Dispatcher {
    pub(crate) fn new(
        translator: PathTranslator,
        registry: WatchRegistry,
        options: AgentOptions,
        sink: SharedSink,
    ) -> Self {
        Self {
            translator,
            mirror: TreeMirror::new(options.fsync_enabled()),
            registry,
            options,
            sink,
            stats: DispatchStats::default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn stats(&self) -> DispatchStats {
        self.stats
    }

    #[cfg(test)]
    pub(crate) fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    pub(crate) fn into_registry(self) -> WatchRegistry {
        self.registry
    }

    /// Blocks on the notification, error and control channels until told to stop.
    ///
    /// A stop request is only observed between events. Returns the registry
    /// so the caller can release the watches.
    pub(crate) fn run(
        mut self,
        notifications: Notifications,
        control: Receiver<Control>,
    ) -> WatchRegistry {
        let Notifications { events, errors } = notifications;
        let closed_events = never();
        let closed_errors = never();
        let mut events_open = true;
        let mut errors_open = true;
        trace_dispatch!("dispatcher running");

        loop {
            let events_rx = if events_open { &events } else { &closed_events };
            let errors_rx = if errors_open { &errors } else { &closed_errors };
            select! {
                recv(control) -> message => match message {
                    Ok(Control::Snapshot(reply)) => {
                        let _ = reply.send(self.registry.snapshot());
                    }
                    Ok(Control::Stats(reply)) => {
                        let _ = reply.send(self.stats);
                    }
                    Ok(Control::Stop) | Err(_) => break,
                },
                recv(events_rx) -> message => match message {
                    Ok(event) => self.handle_notification(&event),
                    Err(_) => {
                        trace_dispatch!("event stream closed");
                        events_open = false;
                    }
                },
                recv(errors_rx) -> message => match message {
                    Ok(error) => self.report_error(&format_args!("watch mechanism: {error}")),
                    Err(_) => errors_open = false,
                },
            }
        }

        trace_dispatch!(stats = ?self.stats, "dispatcher stopped");
        self.into_registry()
    }

    /// Handles one raw notification: one dispatch step.
    pub(crate) fn handle_notification(&mut self, raw: &notify::Event) {
        self.stats.notifications += 1;
        let classification = classify(raw);
        trace_dispatch!(kind = ?raw.kind, paths = raw.paths.len(), "notification");

        for event in &classification.events {
            self.stats.events += 1;
            let decision = self.handle_event(event);
            self.stats.record(decision);
        }

        if classification.rescan {
            if self.options.rescans_on_overflow() {
                self.rescan();
            } else {
                self.report_error(&"events were dropped by the watch mechanism");
            }
        }
    }

    /// Applies the transition table to one event.
    pub(crate) fn handle_event(&mut self, event: &MirrorEvent) -> Decision {
        let source = event.path();
        if source == self.translator.source_root() {
            trace_dispatch!("ignoring event on the source root: {event}");
            return Decision::Ignore;
        }
        if !self.options.is_recursive() && !self.translator.is_direct_child(source) {
            trace_dispatch!("ignoring event outside the mirrored depth: {event}");
            return Decision::Ignore;
        }
        let dest = match self.translator.to_destination(source) {
            Ok(dest) => dest,
            Err(error) => {
                self.report_error(&error);
                return Decision::Ignore;
            }
        };

        if self.options.is_verbose() {
            self.sink.output(&event.to_string());
        }

        let state = match source_state(source) {
            Ok(state) => state,
            Err(error) => {
                self.report_error(&format_args!(
                    "failed to inspect '{}': {error}",
                    source.display()
                ));
                return Decision::Ignore;
            }
        };

        match (event.kind(), state) {
            (MirrorEventKind::Create, SourceState::Directory) => self.create_directory(source, &dest),
            (MirrorEventKind::Create | MirrorEventKind::Modify, SourceState::File) => {
                self.copy_file(source, &dest)
            }
            (
                MirrorEventKind::Modify | MirrorEventKind::Remove | MirrorEventKind::RenameAway,
                SourceState::Missing,
            )
            | (MirrorEventKind::Remove, SourceState::File) => self.delete(source, &dest),
            (MirrorEventKind::Create, SourceState::Missing) => {
                trace_dispatch!("source vanished before handling: {event}");
                Decision::Ignore
            }
            (MirrorEventKind::AttributeChange, _)
            | (
                MirrorEventKind::Modify | MirrorEventKind::Remove | MirrorEventKind::RenameAway,
                SourceState::Directory,
            )
            | (MirrorEventKind::RenameAway, SourceState::File) => Decision::Ignore,
        }
    }

    fn create_directory(&mut self, source: &Path, dest: &Path) -> Decision {
        if !self.options.is_recursive() {
            return match self.mirror.create_dir(source, dest) {
                Ok(()) => Decision::CreateDir,
                Err(error) => {
                    self.report_mirror_error(&error);
                    Decision::Ignore
                }
            };
        }

        let summary = self.seed_directory(source);
        if summary.directories_created > 0 {
            Decision::CreateDir
        } else {
            Decision::Ignore
        }
    }

    fn copy_file(&mut self, source: &Path, dest: &Path) -> Decision {
        match self.mirror.copy_file(source, dest) {
            Ok(_) => Decision::CopyFile,
            Err(error) => {
                self.report_mirror_error(&error);
                Decision::Ignore
            }
        }
    }

    fn delete(&mut self, source: &Path, dest: &Path) -> Decision {
        let (dropped, failures) = self.registry.unregister_subtree(source);
        if dropped > 0 {
            trace_dispatch!("dropped {dropped} watches below {}", source.display());
        }
        for failure in failures {
            self.report_error(&failure);
        }

        match self.mirror.delete_path(dest) {
            Ok(_) => Decision::Delete,
            Err(error) => {
                self.report_error(&error);
                Decision::Ignore
            }
        }
    }

    /// Reports a mirror failure. A path that vanished mid-operation is
    /// expected under concurrent changes and only traced.
    fn report_mirror_error(&mut self, error: &crate::error::MirrorError) {
        if error.source_vanished() {
            trace_dispatch!("skipped: {error}");
        } else {
            self.report_error(error);
        }
    }

    fn report_error(&mut self, error: &dyn fmt::Display) {
        self.stats.errors += 1;
        tracing::warn!(target: "lsync::dispatch", "{error}");
        self.sink.error(&format!("error {error}"));
    }
}

fn source_state(path: &Path) -> io::Result<SourceState> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(SourceState::Directory),
        Ok(_) => Ok(SourceState::File),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(SourceState::Missing),
        Err(error) => Err(error),
    }
}
