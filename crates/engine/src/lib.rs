#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `engine` keeps a destination directory tree mirrored from a live source
//! tree. [`WatchAgent`] is the entry point: [`WatchAgent::start`] reconciles
//! the destination against the source, registers a watch on every mirrored
//! source directory and hands control to a dispatcher thread that applies
//! each change notification to the destination. [`WatchAgent::stop`] (or
//! dropping the agent) stops the dispatcher and releases the watches.
//!
//! # Design
//!
//! - [`paths`] maps between the source and destination coordinate spaces.
//! - [`TreeMirror`] provides the idempotent create, copy and delete steps.
//! - [`WatchRegistry`] records which directories are watched and is the only
//!   place watches are added or removed. It talks to the OS through the
//!   [`WatchBackend`] trait; [`NotifyBackend`] is the `notify` implementation.
//! - Every watch feeds one shared [`Notifications`] stream with exactly one
//!   reader, the dispatcher, which routes events by path. Raw notifications
//!   are normalised by [`classify`] into [`MirrorEvent`]s.
//! - Renames are handled as a deletion of the old name followed by a
//!   creation of the new one; the destination converges once both halves
//!   have been handled.
//!
//! # Invariants
//!
//! - Notifications are handled strictly in delivery order, one at a time.
//! - A failure while handling one event is reported through the sink and
//!   never stops the dispatcher.
//! - When the watch mechanism reports dropped events, a reconciliation walk
//!   repairs the destination (see [`AgentOptions::rescan_on_overflow`]).
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use engine::{AgentOptions, WatchAgent};
//! use logging::CaptureSink;
//!
//! let sink = Arc::new(CaptureSink::new());
//! let mut agent = WatchAgent::new(
//!     "/srv/data",
//!     "/backup/data",
//!     AgentOptions::new().recursive(true),
//!     sink,
//! )?;
//! agent.start()?;
//! // ... the destination now follows the source ...
//! agent.stop()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod agent;
mod backend;
mod dispatch;
mod error;
mod event;
mod mirror;
mod options;
pub mod paths;
mod registry;

pub use agent::WatchAgent;
pub use backend::{NotificationSenders, Notifications, NotifyBackend, WatchBackend, WatchMechanism};
pub use dispatch::{Decision, DispatchStats, ReconcileSummary};
pub use error::{
    ConstructionError, MirrorAction, MirrorError, PathResolutionError, StartError, StopError,
    WatchError,
};
pub use event::{Classification, MirrorEvent, MirrorEventKind, classify};
pub use mirror::{DeleteOutcome, TreeMirror};
pub use options::AgentOptions;
pub use paths::PathTranslator;
pub use registry::{WatchHandle, WatchRegistry};
