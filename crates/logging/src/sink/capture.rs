use std::sync::{Arc, Mutex, PoisonError};

use super::OutputSink;

/// In-memory sink that records every line it receives.
///
/// Clones share the same buffer, so a test can hand one clone to the agent
/// and inspect the other.
#[derive(Clone, Debug, Default)]
pub struct CaptureSink {
    lines: Arc<Mutex<Vec<CapturedLine>>>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum CapturedLine {
    Output(String),
    Error(String),
}

impl CaptureSink {
    /// Creates an empty capture sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the informational lines recorded so far, in order.
    #[must_use]
    pub fn outputs(&self) -> Vec<String> {
        self.collect(|line| match line {
            CapturedLine::Output(text) => Some(text.clone()),
            CapturedLine::Error(_) => None,
        })
    }

    /// Returns the error lines recorded so far, in order.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.collect(|line| match line {
            CapturedLine::Error(text) => Some(text.clone()),
            CapturedLine::Output(_) => None,
        })
    }

    /// Discards every recorded line.
    pub fn clear(&self) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn collect<F>(&self, pick: F) -> Vec<String>
    where
        F: Fn(&CapturedLine) -> Option<String>,
    {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(pick)
            .collect()
    }

    fn push(&self, line: CapturedLine) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
    }
}

impl OutputSink for CaptureSink {
    fn output(&self, message: &str) {
        self.push(CapturedLine::Output(message.to_owned()));
    }

    fn error(&self, message: &str) {
        self.push(CapturedLine::Error(message.to_owned()));
    }
}
