#![deny(unsafe_code)]

//! # Overview
//!
//! `cli` is the command-line front end of `lsync`. It parses the process
//! arguments with `clap`, reports the version, and runs the `watch` command:
//! a [`engine::WatchAgent`] mirrors `--src` into `--dest` until the process
//! receives SIGINT or SIGTERM.
//!
//! # Design
//!
//! [`run`] takes the argument iterator and the two output handles instead of
//! touching the process globals, so the whole surface can be driven from
//! tests with in-memory buffers. The binary wraps the returned status with
//! [`exit_code_from`].
//!
//! # Exit status
//!
//! | status | meaning |
//! |---|---|
//! | `0` | success |
//! | `1` | the agent could not be built, started or stopped |
//! | `2` | the flags could not be parsed |
//! | `3` | a required argument (`--src`, `--dest`) is missing |
//!
//! # Examples
//!
//! ```
//! let mut stdout = Vec::new();
//! let mut stderr = Vec::new();
//! let status = cli::run(["lsync", "--version"], &mut stdout, &mut stderr);
//!
//! assert_eq!(status, 0);
//! assert!(String::from_utf8(stdout).unwrap().starts_with("lsync "));
//! ```

use std::ffi::OsString;
use std::io::{self, Write};
use std::sync::Arc;

use logging::{MessageSink, SharedSink};

mod command;
mod shutdown;
mod watch;

#[cfg(test)]
mod tests;

use command::{Invocation, parse_args};
use shutdown::StopSignal;

/// Name used in the version banner and usage text.
pub const PROGRAM_NAME: &str = "lsync";

/// Version reported by `--version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const MAX_EXIT_CODE: i32 = u8::MAX as i32;

/// Process exit status returned by [`run`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(i32)]
pub enum ExitStatus {
    /// The command completed.
    Ok = 0,
    /// The agent failed.
    Error = 1,
    /// The flags could not be parsed.
    ParseFlags = 2,
    /// A required argument is missing.
    BadArguments = 3,
}

impl ExitStatus {
    /// Numeric status handed to the operating system.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Runs the CLI with the provided arguments and output handles.
///
/// The first argument is the program name, as with [`std::env::args_os`].
/// The returned value is the process exit status. The usage text, banner
/// and command failures go to `stdout` and `stderr`; the agent's own event
/// and error lines go to the process's standard streams, since the agent
/// outlives the borrowed handles on its dispatcher thread.
pub fn run<I, S, Out, Err>(arguments: I, stdout: &mut Out, stderr: &mut Err) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
    Out: Write,
    Err: Write,
{
    let sink: SharedSink = Arc::new(MessageSink::new(io::stdout(), io::stderr()));
    run_until(
        arguments,
        stdout,
        stderr,
        sink,
        shutdown::TerminationSignals::install,
    )
}

/// [`run`] with the agent sink and the stop signal supplied by the caller.
///
/// `arm` is called before the agent starts; `watch` returns once the signal
/// it produced fires.
fn run_until<I, S, Out, Err, A, T>(
    arguments: I,
    stdout: &mut Out,
    stderr: &mut Err,
    sink: SharedSink,
    arm: A,
) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
    Out: Write,
    Err: Write,
    A: FnOnce() -> io::Result<T>,
    T: StopSignal,
{
    let status = match parse_args(arguments) {
        Ok(Invocation::Help(text)) => match stdout.write_all(text.as_bytes()) {
            Ok(()) => ExitStatus::Ok,
            Err(_) => ExitStatus::Error,
        },
        Ok(Invocation::Version) => match writeln!(stdout, "{PROGRAM_NAME} {VERSION}") {
            Ok(()) => ExitStatus::Ok,
            Err(_) => ExitStatus::Error,
        },
        Ok(Invocation::Watch(request)) => watch::execute(&request, stdout, stderr, sink, arm),
        Err(failure) => {
            let _ = writeln!(stderr, "{failure}");
            failure.status()
        }
    };
    status.code()
}

/// Converts a status returned by [`run`] into a process exit code.
///
/// Values outside `0..=255` are clamped.
#[must_use]
pub fn exit_code_from(status: i32) -> std::process::ExitCode {
    let clamped = status.clamp(0, MAX_EXIT_CODE);
    std::process::ExitCode::from(u8::try_from(clamped).unwrap_or(u8::MAX))
}
