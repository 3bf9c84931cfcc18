//! The `watch` command.

use std::io::{self, Write};

use engine::WatchAgent;
use logging::{SharedSink, VerbosityConfig, init_tracing, trace_dispatch};

use crate::ExitStatus;
use crate::command::WatchRequest;
use crate::shutdown::StopSignal;

/// Builds the agent, mirrors the source, then blocks until the stop signal
/// fires and tears the agent down again.
pub(crate) fn execute<Out, Err, A, T>(
    request: &WatchRequest,
    stdout: &mut Out,
    stderr: &mut Err,
    sink: SharedSink,
    arm: A,
) -> ExitStatus
where
    Out: Write,
    Err: Write,
    A: FnOnce() -> io::Result<T>,
    T: StopSignal,
{
    init_tracing(VerbosityConfig::from_verbose_level(request.log_level));

    let mut agent = match WatchAgent::new(&request.source, &request.dest, request.options, sink) {
        Ok(agent) => agent,
        Err(error) => return fail(stderr, "failed to start watcher", &error),
    };

    let signal = match arm() {
        Ok(signal) => signal,
        Err(error) => return fail(stderr, "failed to start watcher", &error),
    };

    let _ = write!(stdout, "{}", banner(&agent));
    let _ = stdout.flush();

    match agent.start() {
        Ok(summary) => trace_dispatch!(
            removed = summary.removed,
            files = summary.files_copied,
            directories = summary.directories_created,
            failures = summary.failures,
            "initial mirror complete"
        ),
        Err(error) => return fail(stderr, "failed to start watcher", &error),
    }

    let waited = signal.wait();
    let stopped = agent.stop();

    if let Err(error) = waited {
        return fail(stderr, "failed to wait for a stop signal", &error);
    }
    if let Err(error) = stopped {
        return fail(stderr, "failed to stop watcher", &error);
    }
    let _ = writeln!(stdout, "watch agent stopped.");
    ExitStatus::Ok
}

fn banner(agent: &WatchAgent) -> String {
    let options = agent.options();
    format!(
        concat!(
            "starting a watch agent...\n",
            "        src: {}\n",
            "       dest: {}\n",
            "  recursive: {}\n",
            "    verbose: {}\n",
            "\n",
            "press Ctrl+C to stop the watch agent.\n",
        ),
        agent.source_root().display(),
        agent.dest_root().display(),
        options.is_recursive(),
        options.is_verbose(),
    )
}

fn fail<Err: Write>(stderr: &mut Err, context: &str, error: &dyn std::error::Error) -> ExitStatus {
    let _ = writeln!(stderr, "{context}. cause: {error}");
    ExitStatus::Error
}
