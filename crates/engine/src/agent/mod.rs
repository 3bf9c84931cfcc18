//! The agent façade: the only entry point the CLI uses.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, bounded};
use logging::{SharedSink, trace_dispatch, trace_watch};

use crate::backend::WatchMechanism;
use crate::dispatch::{Control, DispatchStats, Dispatcher, ReconcileSummary, WatchFailurePolicy};
use crate::error::{ConstructionError, PathResolutionError, StartError, StopError};
use crate::options::AgentOptions;
use crate::paths::{self, PathTranslator};
use crate::registry::WatchRegistry;

#[cfg(test)]
mod tests;

enum AgentState {
    Idle,
    Running {
        control: Sender<Control>,
        dispatcher: JoinHandle<WatchRegistry>,
    },
    Stopped,
}

/// Mirrors a source tree into a destination tree and keeps it live.
///
/// [`start`](Self::start) reconciles the destination, watches the source and
/// spawns the dispatcher thread; [`stop`](Self::stop) (also run on drop)
/// stops the dispatcher and releases every watch.
pub struct WatchAgent {
    translator: PathTranslator,
    options: AgentOptions,
    sink: SharedSink,
    mechanism: Option<WatchMechanism>,
    state: AgentState,
}

impl WatchAgent {
    /// Validates the roots; the platform watcher is opened by [`start`](Self::start).
    ///
    /// Both roots must resolve to existing directories that are distinct and
    /// not nested inside each other.
    pub fn new(
        source: impl AsRef<Path>,
        dest: impl AsRef<Path>,
        options: AgentOptions,
        sink: SharedSink,
    ) -> Result<Self, ConstructionError> {
        let translator = validate_roots(source.as_ref(), dest.as_ref())?;
        Ok(Self {
            translator,
            options,
            sink,
            mechanism: None,
            state: AgentState::Idle,
        })
    }

    /// Like [`new`](Self::new) but watches through the supplied mechanism.
    pub fn with_mechanism(
        source: impl AsRef<Path>,
        dest: impl AsRef<Path>,
        options: AgentOptions,
        sink: SharedSink,
        mechanism: WatchMechanism,
    ) -> Result<Self, ConstructionError> {
        let mut agent = Self::new(source, dest, options, sink)?;
        agent.mechanism = Some(mechanism);
        Ok(agent)
    }

    /// Resolved source root.
    #[must_use]
    pub fn source_root(&self) -> &Path {
        self.translator.source_root()
    }

    /// Resolved destination root.
    #[must_use]
    pub fn dest_root(&self) -> &Path {
        self.translator.dest_root()
    }

    /// Options the agent was built with.
    #[must_use]
    pub const fn options(&self) -> &AgentOptions {
        &self.options
    }

    /// Reports whether the dispatcher is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self.state, AgentState::Running { .. })
    }

    /// Reconciles the destination, registers the initial watches and spawns
    /// the dispatcher.
    ///
    /// Per-path mirroring failures are reported through the sink and do not
    /// fail the start; a watch that cannot be registered does. After a
    /// failed start the agent is stopped.
    pub fn start(&mut self) -> Result<ReconcileSummary, StartError> {
        match self.state {
            AgentState::Idle => {}
            AgentState::Running { .. } => return Err(StartError::AlreadyRunning),
            AgentState::Stopped => return Err(StartError::Stopped),
        }
        self.state = AgentState::Stopped;

        let mechanism = match self.mechanism.take() {
            Some(mechanism) => mechanism,
            None => WatchMechanism::open()?,
        };
        let (backend, notifications) = mechanism.into_parts();
        let mut dispatcher = Dispatcher::new(
            self.translator.clone(),
            WatchRegistry::new(backend),
            self.options,
            Arc::clone(&self.sink),
        );

        let summary = match dispatcher.reconcile(WatchFailurePolicy::Abort) {
            Ok(summary) => summary,
            Err(error) => {
                release(dispatcher.into_registry(), &self.sink);
                return Err(error);
            }
        };

        let (control, control_rx) = crossbeam_channel::unbounded();
        let handle = thread::Builder::new()
            .name("lsync-dispatch".to_owned())
            .spawn(move || dispatcher.run(notifications, control_rx))
            .map_err(StartError::Spawn)?;

        trace_dispatch!(
            watches = summary.watches_registered,
            files = summary.files_copied,
            "agent started for {}",
            self.source_root().display()
        );
        self.state = AgentState::Running {
            control,
            dispatcher: handle,
        };
        Ok(summary)
    }

    /// Stops the dispatcher and releases every watch, deepest first.
    ///
    /// Idempotent, and safe to call when [`start`](Self::start) was never
    /// called or failed.
    pub fn stop(&mut self) -> Result<(), StopError> {
        let state = std::mem::replace(&mut self.state, AgentState::Stopped);
        let AgentState::Running {
            control,
            dispatcher,
        } = state
        else {
            self.mechanism = None;
            return Ok(());
        };

        let _ = control.send(Control::Stop);
        match dispatcher.join() {
            Ok(registry) => {
                release(registry, &self.sink);
                trace_dispatch!("agent stopped for {}", self.source_root().display());
                Ok(())
            }
            Err(_) => Err(StopError::DispatcherPanicked),
        }
    }

    /// Directories currently watched, parents first. Empty unless running.
    #[must_use]
    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.request(Control::Snapshot).unwrap_or_default()
    }

    /// Dispatcher counters, or `None` unless running.
    #[must_use]
    pub fn stats(&self) -> Option<DispatchStats> {
        self.request(Control::Stats)
    }

    fn request<T>(&self, make: impl FnOnce(Sender<T>) -> Control) -> Option<T> {
        let AgentState::Running { control, .. } = &self.state else {
            return None;
        };
        let (reply, response) = bounded(1);
        control.send(make(reply)).ok()?;
        response.recv().ok()
    }
}

impl Drop for WatchAgent {
    fn drop(&mut self) {
        if let Err(error) = self.stop() {
            self.sink.error(&format!("error {error}"));
        }
    }
}

impl fmt::Debug for WatchAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchAgent")
            .field("source_root", &self.source_root())
            .field("dest_root", &self.dest_root())
            .field("options", &self.options)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

fn release(registry: WatchRegistry, sink: &SharedSink) {
    let watches = registry.len();
    for failure in registry.teardown() {
        sink.error(&format!("error {failure}"));
    }
    trace_watch!("released {watches} watches");
}

fn validate_roots(source: &Path, dest: &Path) -> Result<PathTranslator, ConstructionError> {
    let source = paths::resolve(source)?;
    let dest = paths::resolve(dest)?;

    for root in [&source, &dest] {
        let is_dir = fs::metadata(root)
            .map_err(|error| PathResolutionError::resolve(root.as_path(), error))?
            .is_dir();
        if !is_dir {
            return Err(ConstructionError::NotADirectory(root.clone()));
        }
    }

    if source == dest {
        return Err(ConstructionError::SameRoot(source));
    }
    if dest.starts_with(&source) {
        return Err(ConstructionError::NestedRoots {
            outer: source,
            inner: dest,
        });
    }
    if source.starts_with(&dest) {
        return Err(ConstructionError::NestedRoots {
            outer: dest,
            inner: source,
        });
    }

    Ok(PathTranslator::new(source, dest))
}
