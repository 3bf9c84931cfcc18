#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` carries the diagnostics plumbing shared by the lsync workspace.
//! The mirror engine never prints directly: every user-visible line flows
//! through an [`OutputSink`], while structured diagnostics are emitted with
//! `tracing` under `lsync::*` targets via the `trace_*!` macros exported here.
//!
//! # Design
//!
//! - [`OutputSink`] is the two-method interface (`output`, `error`) the agent
//!   reports through. Sinks are shared between the caller and the dispatcher
//!   thread, so the trait requires `Send + Sync`.
//! - [`MessageSink`] renders lines into a pair of [`std::io::Write`]
//!   implementors, appending a newline according to its [`LineMode`].
//! - [`TracingSink`] forwards lines to `tracing` so embedders that already run
//!   a subscriber do not need a second output path.
//! - [`CaptureSink`] keeps lines in memory for tests.
//! - [`VerbosityConfig`] maps a `-v` count onto per-subsystem levels and, with
//!   the `tracing` feature, [`init_tracing`] installs a fmt subscriber built
//!   from those levels.
//!
//! # Invariants
//!
//! - Writing to a sink never panics. Failures of the underlying writer are
//!   swallowed because no agent behaviour depends on diagnostics succeeding.
//! - Lines written through one [`MessageSink`] are never interleaved with each
//!   other; each write holds the writer's lock for the full line.
//!
//! # Examples
//!
//! ```
//! use logging::{CaptureSink, OutputSink};
//!
//! let sink = CaptureSink::new();
//! sink.output("create /src/a.txt");
//! sink.error("error permission denied");
//!
//! assert_eq!(sink.outputs(), vec!["create /src/a.txt".to_string()]);
//! assert_eq!(sink.errors().len(), 1);
//! ```

mod config;
mod line_mode;
mod sink;
#[cfg(feature = "tracing")]
mod tracing_bridge;
mod tracing_macros;

pub use config::{Subsystem, VerbosityConfig};
pub use line_mode::LineMode;
pub use sink::{CaptureSink, MessageSink, OutputSink, SharedSink, TracingSink};
#[cfg(feature = "tracing")]
pub use tracing_bridge::{LOG_ENV_VAR, init_tracing};
