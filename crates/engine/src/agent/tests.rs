use std::fs;
use std::sync::Arc;

use logging::CaptureSink;
use notify::EventKind;
use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind};
use test_support::{SETTLE_TIMEOUT, TestTree, wait_until};

use super::*;
use crate::backend::recording::{BackendCall, RecordingBackend};
use crate::backend::{NotificationSenders, Notifications};

struct Fixture {
    tree: TestTree,
    backend: RecordingBackend,
    senders: NotificationSenders,
    sink: CaptureSink,
    agent: WatchAgent,
}

fn fixture(options: AgentOptions) -> Fixture {
    let tree = TestTree::new().expect("test tree");
    let backend = RecordingBackend::new();
    let (senders, notifications) = Notifications::unbounded();
    let sink = CaptureSink::new();
    let agent = WatchAgent::with_mechanism(
        tree.src(),
        tree.dest(),
        options.fsync(false),
        Arc::new(sink.clone()),
        WatchMechanism::new(backend.clone(), notifications),
    )
    .expect("agent");
    Fixture {
        tree,
        backend,
        senders,
        sink,
        agent,
    }
}

fn send(senders: &NotificationSenders, kind: EventKind, path: PathBuf) {
    senders
        .events
        .send(notify::Event::new(kind).add_path(path))
        .expect("send notification");
}

fn quiet_sink() -> SharedSink {
    Arc::new(CaptureSink::new())
}

#[test]
fn new_rejects_identical_roots() {
    let tree = TestTree::new().expect("test tree");
    let alias = tree.src().join(".");
    let error = WatchAgent::new(tree.src(), &alias, AgentOptions::new(), quiet_sink())
        .expect_err("same root");
    assert!(matches!(error, ConstructionError::SameRoot(path) if path == tree.src()));
}

#[test]
fn new_rejects_missing_roots() {
    let tree = TestTree::new().expect("test tree");
    let error = WatchAgent::new(
        tree.src_path("missing"),
        tree.dest(),
        AgentOptions::new(),
        quiet_sink(),
    )
    .expect_err("missing source");
    assert!(matches!(error, ConstructionError::Resolution(_)));
}

#[test]
fn new_rejects_file_roots() {
    let tree = TestTree::new().expect("test tree");
    let file = tree.write_dest("file.txt", "x").expect("write");
    let error = WatchAgent::new(tree.src(), &file, AgentOptions::new(), quiet_sink())
        .expect_err("file destination");
    assert!(matches!(error, ConstructionError::NotADirectory(path) if path == file));
}

#[test]
fn new_rejects_nested_roots() {
    let tree = TestTree::new().expect("test tree");
    let inner = tree.mkdir_src("mirror").expect("mkdir");

    let error = WatchAgent::new(tree.src(), &inner, AgentOptions::new(), quiet_sink())
        .expect_err("dest inside source");
    assert!(matches!(error, ConstructionError::NestedRoots { .. }));

    let error = WatchAgent::new(&inner, tree.src(), AgentOptions::new(), quiet_sink())
        .expect_err("source inside dest");
    assert!(matches!(error, ConstructionError::NestedRoots { outer, .. } if outer == tree.src()));
}

#[cfg(unix)]
#[test]
fn new_resolves_symlinked_roots() {
    let tree = TestTree::new().expect("test tree");
    let link = tree.dest().with_file_name("src-link");
    std::os::unix::fs::symlink(tree.src(), &link).expect("symlink");

    let agent = WatchAgent::new(&link, tree.dest(), AgentOptions::new(), quiet_sink())
        .expect("agent");
    assert_eq!(agent.source_root(), tree.src());
}

#[test]
fn start_mirrors_existing_tree_and_registers_watches() {
    let mut f = fixture(AgentOptions::new().recursive(true));
    f.tree.write_src("a/b.txt", "hi").expect("write");
    f.tree.write_src("top.txt", "top").expect("write");
    f.tree.write_dest("stale.txt", "old").expect("write stale");

    let summary = f.agent.start().expect("start");
    assert_eq!(summary.files_copied, 2);
    assert_eq!(summary.removed, 1);
    assert_eq!(summary.watches_registered, 2);
    assert!(f.agent.is_running());

    assert_eq!(f.tree.read_dest("a/b.txt").as_deref(), Some(&b"hi"[..]));
    assert!(!f.tree.dest_exists("stale.txt"));
    assert_eq!(
        f.agent.watched_paths(),
        vec![f.tree.src().to_path_buf(), f.tree.src_path("a")]
    );
    assert_eq!(f.agent.stats(), Some(DispatchStats::default()));
}

#[test]
fn stop_releases_watches_deepest_first_and_is_idempotent() {
    let mut f = fixture(AgentOptions::new().recursive(true));
    f.tree.mkdir_src("a/b").expect("mkdir");
    f.agent.start().expect("start");

    f.agent.stop().expect("stop");
    f.agent.stop().expect("stop again");
    assert!(!f.agent.is_running());
    assert!(f.agent.watched_paths().is_empty());
    assert!(f.agent.stats().is_none());
    assert!(f.backend.active().is_empty());

    let removals: Vec<_> = f
        .backend
        .calls()
        .into_iter()
        .filter(|call| matches!(call, BackendCall::Remove(_)))
        .collect();
    assert_eq!(
        removals,
        vec![
            BackendCall::Remove(f.tree.src_path("a/b")),
            BackendCall::Remove(f.tree.src_path("a")),
            BackendCall::Remove(f.tree.src().to_path_buf()),
        ]
    );
}

#[test]
fn stop_before_start_is_harmless() {
    let mut f = fixture(AgentOptions::new());
    f.agent.stop().expect("stop");
    assert!(matches!(f.agent.start(), Err(StartError::Stopped)));
}

#[test]
fn start_twice_is_rejected() {
    let mut f = fixture(AgentOptions::new());
    f.agent.start().expect("start");
    assert!(matches!(f.agent.start(), Err(StartError::AlreadyRunning)));
}

#[test]
fn failed_start_leaves_nothing_watched() {
    let mut f = fixture(AgentOptions::new().recursive(true));
    f.tree.mkdir_src("locked").expect("mkdir");
    f.backend.reject(f.tree.src_path("locked"));

    let error = f.agent.start().expect_err("watch rejected");
    assert!(matches!(error, StartError::Watch(_)));
    assert!(!f.agent.is_running());
    assert!(f.backend.active().is_empty());
    f.agent.stop().expect("stop after failed start");
}

#[test]
fn notifications_drive_the_mirror() {
    let mut f = fixture(AgentOptions::new().recursive(true).verbose(true));
    f.agent.start().expect("start");

    let file = f.tree.write_src("a/b.txt", "hi").expect("write");
    send(
        &f.senders,
        EventKind::Create(CreateKind::Folder),
        f.tree.src_path("a"),
    );
    assert!(f.tree.wait_for_dest_contents("a/b.txt", "hi"));

    fs::write(&file, "bye").expect("rewrite");
    send(
        &f.senders,
        EventKind::Modify(ModifyKind::Data(DataChange::Content)),
        file,
    );
    assert!(f.tree.wait_for_dest_contents("a/b.txt", "bye"));
    assert!(f.agent.watched_paths().contains(&f.tree.src_path("a")));

    f.tree.remove_src("a").expect("remove");
    send(
        &f.senders,
        EventKind::Remove(RemoveKind::Folder),
        f.tree.src_path("a"),
    );
    assert!(f.tree.wait_for_dest_absent("a"));
    assert!(wait_until(SETTLE_TIMEOUT, || {
        !f.agent.watched_paths().contains(&f.tree.src_path("a"))
    }));

    let stats = f.agent.stats().expect("running");
    assert_eq!(stats.notifications, 3);
    assert_eq!(stats.decisions(), 3);
    assert_eq!(f.sink.outputs().len(), 3);
    assert!(f.sink.errors().is_empty());
}

#[test]
fn mechanism_errors_do_not_stop_the_agent() {
    let mut f = fixture(AgentOptions::new());
    f.agent.start().expect("start");

    f.senders
        .errors
        .send(notify::Error::generic("queue overflow"))
        .expect("send error");
    assert!(wait_until(SETTLE_TIMEOUT, || {
        f.agent.stats().is_some_and(|stats| stats.errors == 1)
    }));

    f.tree.write_src("late.txt", "x").expect("write");
    send(
        &f.senders,
        EventKind::Create(CreateKind::File),
        f.tree.src_path("late.txt"),
    );
    assert!(f.tree.wait_for_dest_contents("late.txt", "x"));
    assert_eq!(f.sink.errors().len(), 1);
    assert!(f.sink.errors()[0].starts_with("error "));
}

#[test]
fn dropping_the_agent_stops_it() {
    let f = fixture(AgentOptions::new());
    let Fixture {
        mut agent,
        backend,
        ..
    } = f;
    agent.start().expect("start");
    assert_eq!(backend.active().len(), 1);

    drop(agent);
    assert!(backend.active().is_empty());
}
