use super::OutputSink;

/// Sink that forwards lines to the active `tracing` subscriber.
///
/// Informational lines become `info` events and error lines become `error`
/// events, both under the `lsync::output` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn output(&self, message: &str) {
        tracing::info!(target: "lsync::output", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "lsync::output", "{message}");
    }
}
