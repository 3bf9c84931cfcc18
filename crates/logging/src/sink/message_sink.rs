use std::fmt;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use super::OutputSink;
use crate::line_mode::LineMode;

/// Line-oriented sink that writes informational lines to one writer and
/// error lines to another.
///
/// Each writer sits behind its own mutex so the dispatcher thread and the
/// owning thread can report concurrently without interleaving partial lines.
///
/// # Examples
///
/// Collect output into in-memory buffers:
///
/// ```
/// use logging::{MessageSink, OutputSink};
///
/// let sink = MessageSink::new(Vec::new(), Vec::new());
/// sink.output("create /src/a.txt");
/// sink.error("error vanished");
///
/// let (out, err) = sink.into_inner();
/// assert_eq!(out, b"create /src/a.txt\n");
/// assert_eq!(err, b"error vanished\n");
/// ```
///
/// Render without a trailing newline:
///
/// ```
/// use logging::{LineMode, MessageSink, OutputSink};
///
/// let sink = MessageSink::with_line_mode(Vec::new(), Vec::new(), LineMode::WithoutNewline);
/// sink.output("ready");
/// assert_eq!(sink.into_inner().0, b"ready".to_vec());
/// ```
pub struct MessageSink<O, E> {
    out: Mutex<O>,
    err: Mutex<E>,
    line_mode: LineMode,
}

impl<O, E> MessageSink<O, E> {
    /// Creates a sink that appends a newline after each line.
    #[must_use]
    pub fn new(out: O, err: E) -> Self {
        Self::with_line_mode(out, err, LineMode::WithNewline)
    }

    /// Creates a sink with an explicit [`LineMode`].
    #[must_use]
    pub fn with_line_mode(out: O, err: E, line_mode: LineMode) -> Self {
        Self {
            out: Mutex::new(out),
            err: Mutex::new(err),
            line_mode,
        }
    }

    /// Returns the configured [`LineMode`].
    #[must_use]
    pub const fn line_mode(&self) -> LineMode {
        self.line_mode
    }

    /// Consumes the sink and returns the informational and error writers.
    #[must_use]
    pub fn into_inner(self) -> (O, E) {
        (
            self.out.into_inner().unwrap_or_else(PoisonError::into_inner),
            self.err.into_inner().unwrap_or_else(PoisonError::into_inner),
        )
    }
}

impl<O, E> MessageSink<O, E>
where
    O: Write,
    E: Write,
{
    fn write_line<W: Write>(writer: &Mutex<W>, line_mode: LineMode, message: &str) -> io::Result<()> {
        let mut guard = writer.lock().unwrap_or_else(PoisonError::into_inner);
        guard.write_all(message.as_bytes())?;
        if line_mode.append_newline() {
            guard.write_all(b"\n")?;
        }
        guard.flush()
    }
}

impl<O, E> OutputSink for MessageSink<O, E>
where
    O: Write + Send,
    E: Write + Send,
{
    fn output(&self, message: &str) {
        let _ = Self::write_line(&self.out, self.line_mode, message);
    }

    fn error(&self, message: &str) {
        let _ = Self::write_line(&self.err, self.line_mode, message);
    }
}

impl<O, E> fmt::Debug for MessageSink<O, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageSink")
            .field("line_mode", &self.line_mode)
            .finish_non_exhaustive()
    }
}
