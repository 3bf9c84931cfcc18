use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use logging::CaptureSink;
use test_support::{SETTLE_TIMEOUT, TestTree, wait_until};

use super::*;
use crate::command::{ParseFailure, WatchRequest};

struct Scripted<F>(F);

impl<F> StopSignal for Scripted<F>
where
    F: FnOnce() -> io::Result<()>,
{
    fn wait(self) -> io::Result<()> {
        (self.0)()
    }
}

type Immediate = Scripted<fn() -> io::Result<()>>;

fn no_wait() -> io::Result<()> {
    Ok(())
}

fn immediately() -> io::Result<Immediate> {
    Ok(Scripted(no_wait as fn() -> io::Result<()>))
}

fn run_captured<I, S>(arguments: I) -> (i32, String, String)
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let status = run_until(
        arguments,
        &mut stdout,
        &mut stderr,
        Arc::new(CaptureSink::new()),
        immediately,
    );
    (
        status,
        String::from_utf8(stdout).expect("stdout is UTF-8"),
        String::from_utf8(stderr).expect("stderr is UTF-8"),
    )
}

fn watch_args(tree: &TestTree, extra: &[&str]) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "lsync".into(),
        "watch".into(),
        "--src".into(),
        tree.src().into(),
        "-d".into(),
        tree.dest().into(),
    ];
    args.extend(extra.iter().map(OsString::from));
    args
}

#[test]
fn version_flag_prints_program_and_version() {
    for flag in ["--version", "-V", "version"] {
        let (status, stdout, stderr) = run_captured(["lsync", flag]);
        assert_eq!(status, 0, "{flag}");
        assert_eq!(stdout, format!("lsync {VERSION}\n"));
        assert!(stderr.is_empty());
    }
}

#[test]
fn help_flags_print_usage() {
    let (status, stdout, _) = run_captured(["lsync", "--help"]);
    assert_eq!(status, 0);
    assert!(stdout.starts_with("usage: lsync"));
    assert!(stdout.contains("watch"));

    let (status, stdout, _) = run_captured(["lsync", "watch", "-h"]);
    assert_eq!(status, 0);
    assert!(stdout.starts_with("usage: lsync watch"));
    assert!(stdout.contains("--recursive, -r"));
}

#[test]
fn missing_command_is_a_usage_error() {
    let (status, stdout, stderr) = run_captured(["lsync"]);
    assert_eq!(status, ExitStatus::ParseFlags.code());
    assert!(stdout.is_empty());
    assert!(stderr.starts_with("usage: lsync"));

    let (status, _, _) = run_captured(std::iter::empty::<OsString>());
    assert_eq!(status, 2);
}

#[test]
fn unknown_flags_and_commands_fail_to_parse() {
    let (status, _, stderr) = run_captured(["lsync", "watch", "--definitely-invalid"]);
    assert_eq!(status, 2);
    assert!(stderr.contains("--definitely-invalid"), "{stderr}");

    let (status, _, _) = run_captured(["lsync", "sync"]);
    assert_eq!(status, 2);

    let (status, _, _) = run_captured(["lsync", "watch", "--src"]);
    assert_eq!(status, 2);
}

#[test]
fn missing_roots_are_bad_arguments() {
    let (status, stdout, stderr) = run_captured(["lsync", "watch", "--dest", "/tmp"]);
    assert_eq!(status, 3);
    assert!(stdout.is_empty());
    assert_eq!(stderr, "missing SRC.\n");

    let (status, _, stderr) = run_captured(["lsync", "watch", "-s", "/tmp"]);
    assert_eq!(status, 3);
    assert_eq!(stderr, "missing DEST.\n");
}

#[test]
fn watch_flags_map_onto_agent_options() {
    let parsed = command::parse_args([
        "lsync",
        "watch",
        "-s",
        "a",
        "--dest",
        "b",
        "-r",
        "--verbose",
        "--no-fsync",
        "-vv",
    ])
    .expect("parse");

    let Invocation::Watch(WatchRequest {
        source,
        dest,
        options,
        log_level,
    }) = parsed
    else {
        panic!("expected watch, got {parsed:?}");
    };
    assert_eq!(source, PathBuf::from("a"));
    assert_eq!(dest, PathBuf::from("b"));
    assert!(options.is_recursive());
    assert!(options.is_verbose());
    assert!(!options.fsync_enabled());
    assert!(options.rescans_on_overflow());
    assert_eq!(log_level, 2);
}

#[test]
fn watch_defaults_are_non_recursive_and_quiet() {
    let parsed = command::parse_args(["lsync", "watch", "-s", "a", "-d", "b", "--no-rescan"])
        .expect("parse");
    let Invocation::Watch(request) = parsed else {
        panic!("expected watch");
    };
    assert!(!request.options.is_recursive());
    assert!(!request.options.is_verbose());
    assert!(request.options.fsync_enabled());
    assert!(!request.options.rescans_on_overflow());
    assert_eq!(request.log_level, 0);
}

#[test]
fn parse_failures_map_to_exit_statuses() {
    assert_eq!(ParseFailure::MissingSource.status(), ExitStatus::BadArguments);
    assert_eq!(ParseFailure::MissingDest.status(), ExitStatus::BadArguments);
    assert_eq!(ParseFailure::MissingCommand.status(), ExitStatus::ParseFlags);
}

#[test]
fn watch_mirrors_then_stops_when_signalled() {
    let tree = TestTree::new().expect("test tree");
    tree.write_src("a/b.txt", "hi").expect("write");

    let (status, stdout, stderr) = run_captured(watch_args(&tree, &["-r"]));
    assert_eq!(status, 0, "{stderr}");
    assert!(stderr.is_empty(), "{stderr}");
    assert!(stdout.starts_with("starting a watch agent...\n"));
    assert!(stdout.contains(&format!("        src: {}\n", tree.src().display())));
    assert!(stdout.contains("  recursive: true\n"));
    assert!(stdout.contains("    verbose: false\n"));
    assert!(stdout.ends_with("watch agent stopped.\n"));
    assert_eq!(tree.read_dest("a/b.txt").as_deref(), Some(&b"hi"[..]));
}

#[test]
fn watch_keeps_mirroring_until_the_signal_fires() {
    let tree = TestTree::new().expect("test tree");
    let sink = CaptureSink::new();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();

    let status = run_until(
        watch_args(&tree, &["--verbose"]),
        &mut stdout,
        &mut stderr,
        Arc::new(sink.clone()),
        || {
            Ok(Scripted(|| {
                tree.write_src("live.txt", "live")?;
                assert!(tree.wait_for_dest_contents("live.txt", "live"));
                Ok(())
            }))
        },
    );

    assert_eq!(status, 0, "{}", String::from_utf8_lossy(&stderr));
    assert!(wait_until(SETTLE_TIMEOUT, || {
        sink.outputs()
            .iter()
            .any(|line| line.starts_with("create ") && line.ends_with("live.txt"))
    }));
}

#[test]
fn unusable_roots_fail_with_error_status() {
    let tree = TestTree::new().expect("test tree");
    let missing = tree.src_path("missing");
    let (status, stdout, stderr) = run_captured([
        OsString::from("lsync"),
        "watch".into(),
        "-s".into(),
        missing.into(),
        "-d".into(),
        tree.dest().into(),
    ]);
    assert_eq!(status, ExitStatus::Error.code());
    assert!(stdout.is_empty());
    assert!(stderr.starts_with("failed to start watcher. cause: "), "{stderr}");

    let (status, _, _) = run_captured([
        OsString::from("lsync"),
        "watch".into(),
        "-s".into(),
        tree.src().into(),
        "-d".into(),
        tree.src().into(),
    ]);
    assert_eq!(status, 1);
}

#[test]
fn failing_to_arm_the_signal_leaves_the_destination_alone() {
    let tree = TestTree::new().expect("test tree");
    tree.write_src("a.txt", "a").expect("write");
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();

    let status = run_until(
        watch_args(&tree, &[]),
        &mut stdout,
        &mut stderr,
        Arc::new(CaptureSink::new()),
        || -> io::Result<Immediate> {
            Err(io::Error::other("no signals here"))
        },
    );

    assert_eq!(status, 1);
    assert!(String::from_utf8_lossy(&stderr).contains("no signals here"));
    assert!(!tree.dest_exists("a.txt"));
}

#[test]
fn exit_code_from_clamps_out_of_range_statuses() {
    assert_eq!(exit_code_from(0), std::process::ExitCode::SUCCESS);
    assert_eq!(exit_code_from(3), std::process::ExitCode::from(3));
    assert_eq!(exit_code_from(-1), std::process::ExitCode::from(0));
    assert_eq!(exit_code_from(1000), std::process::ExitCode::from(255));
}
