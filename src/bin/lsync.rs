#![deny(unsafe_code)]

use mimalloc::MiMalloc;

/// High-performance memory allocator for improved allocation throughput.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::{env, io, process::ExitCode};

fn main() -> ExitCode {
    // Unlocked handles: the agent's dispatcher thread writes to the same
    // streams while `main` is blocked waiting for a signal.
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let status = cli::run(env::args_os(), &mut stdout, &mut stderr);
    cli::exit_code_from(status)
}
