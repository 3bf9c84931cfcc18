use std::io::{BufRead, BufReader};
use std::process::Stdio;

use assert_cmd::Command;
use test_support::TestTree;

fn lsync() -> Command {
    Command::new(env!("CARGO_BIN_EXE_lsync"))
}

#[test]
fn version_flag_reports_the_package_version() {
    let output = lsync().arg("--version").output().expect("run lsync");
    assert!(output.status.success());
    assert!(output.stderr.is_empty(), "--version must not write to stderr");
    let stdout = String::from_utf8(output.stdout).expect("stdout is UTF-8");
    assert_eq!(stdout, format!("lsync {}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn watch_without_source_exits_with_bad_arguments() {
    let tree = TestTree::new().expect("test tree");
    let output = lsync()
        .args(["watch", "--dest"])
        .arg(tree.dest())
        .output()
        .expect("run lsync");
    assert_eq!(output.status.code(), Some(3));
    assert_eq!(String::from_utf8_lossy(&output.stderr), "missing SRC.\n");
}

#[test]
fn unknown_flag_exits_with_parse_error() {
    let output = lsync()
        .args(["watch", "--definitely-not-a-flag"])
        .output()
        .expect("run lsync");
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    assert!(!output.stderr.is_empty(), "invalid flag should emit diagnostics");
}

#[test]
fn missing_source_directory_exits_with_error() {
    let tree = TestTree::new().expect("test tree");
    let output = lsync()
        .args(["watch", "-s"])
        .arg(tree.src_path("absent"))
        .arg("-d")
        .arg(tree.dest())
        .output()
        .expect("run lsync");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("failed to start watcher."));
}

#[cfg(unix)]
#[test]
fn watch_mirrors_and_exits_cleanly_on_sigterm() {
    let tree = TestTree::new().expect("test tree");
    tree.write_src("a/b.txt", "hi").expect("write");

    let mut child = std::process::Command::new(env!("CARGO_BIN_EXE_lsync"))
        .args(["watch", "-r", "-s"])
        .arg(tree.src())
        .arg("-d")
        .arg(tree.dest())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn lsync");

    let stdout = child.stdout.take().expect("piped stdout");
    let mut lines = BufReader::new(stdout).lines();
    let armed = lines
        .by_ref()
        .map_while(Result::ok)
        .any(|line| line.starts_with("press Ctrl+C"));
    assert!(armed, "banner should announce how to stop the agent");

    assert!(tree.wait_for_dest_contents("a/b.txt", "hi"));

    let killed = std::process::Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .expect("run kill");
    assert!(killed.success());

    let status = child.wait().expect("wait for lsync");
    assert_eq!(status.code(), Some(0));
    let rest: Vec<String> = lines.map_while(Result::ok).collect();
    assert_eq!(rest.last().map(String::as_str), Some("watch agent stopped."));
}
