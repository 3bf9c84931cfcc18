//! Output sinks used to report agent activity to the user.

use std::sync::Arc;

mod capture;
mod message_sink;
mod tracing_sink;

pub use capture::CaptureSink;
pub use message_sink::MessageSink;
pub use tracing_sink::TracingSink;

/// Destination for user-visible diagnostics.
///
/// The mirror agent reports handled events through [`output`](Self::output)
/// (only when verbose) and failures through [`error`](Self::error) (always).
/// Implementations must tolerate concurrent calls from the dispatcher thread
/// and the thread that owns the agent.
pub trait OutputSink: Send + Sync {
    /// Reports an informational line.
    fn output(&self, message: &str);

    /// Reports an error line.
    fn error(&self, message: &str);
}

/// Reference-counted sink handle shared between the agent and its dispatcher.
pub type SharedSink = Arc<dyn OutputSink>;

impl<S> OutputSink for Arc<S>
where
    S: OutputSink + ?Sized,
{
    fn output(&self, message: &str) {
        (**self).output(message);
    }

    fn error(&self, message: &str) {
        (**self).error(message);
    }
}

impl<S> OutputSink for &S
where
    S: OutputSink + ?Sized,
{
    fn output(&self, message: &str) {
        (**self).output(message);
    }

    fn error(&self, message: &str) {
        (**self).error(message);
    }
}
