//! Normalisation of raw `notify` events into [`MirrorEvent`]s.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use notify::EventKind;
use notify::event::{ModifyKind, RenameMode};

/// What happened to a source path.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MirrorEventKind {
    /// The path appeared, by creation or by being moved in.
    Create,
    /// File contents were written.
    Modify,
    /// The path was deleted.
    Remove,
    /// The path was moved away.
    RenameAway,
    /// Permission bits or other metadata changed.
    AttributeChange,
}

impl MirrorEventKind {
    /// Short label used in verbose output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Modify => "write",
            Self::Remove => "remove",
            Self::RenameAway => "rename",
            Self::AttributeChange => "chmod",
        }
    }
}

impl fmt::Display for MirrorEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalised notification for one absolute source path.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MirrorEvent {
    kind: MirrorEventKind,
    path: PathBuf,
    observed_at: SystemTime,
}

impl MirrorEvent {
    /// Creates an event observed now.
    pub fn new(kind: MirrorEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            observed_at: SystemTime::now(),
        }
    }

    /// Returns the event kind.
    #[must_use]
    pub const fn kind(&self) -> MirrorEventKind {
        self.kind
    }

    /// Returns the absolute source path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns when the raw notification was read off the stream.
    #[must_use]
    pub const fn observed_at(&self) -> SystemTime {
        self.observed_at
    }
}

impl fmt::Display for MirrorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.path.display())
    }
}

/// Result of classifying one raw notification.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Classification {
    /// One event per affected path.
    pub events: Vec<MirrorEvent>,
    /// The mechanism dropped events and the tree must be rescanned.
    pub rescan: bool,
}

/// Maps a raw notification onto mirror events.
///
/// An ambiguous rename (`RenameMode::Any`) is resolved by checking whether the
/// path exists now. A paired rename (`RenameMode::Both`) yields nothing
/// because its halves also arrive separately.
#[must_use]
pub fn classify(event: &notify::Event) -> Classification {
    let rescan = event.need_rescan();
    let kind = match event.kind {
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            Some(KindRule::Fixed(MirrorEventKind::Create))
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            Some(KindRule::Fixed(MirrorEventKind::RenameAway))
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Any | RenameMode::Other)) => {
            Some(KindRule::ByExistence)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => None,
        EventKind::Modify(ModifyKind::Metadata(_)) => {
            Some(KindRule::Fixed(MirrorEventKind::AttributeChange))
        }
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Other) => {
            Some(KindRule::Fixed(MirrorEventKind::Modify))
        }
        EventKind::Remove(_) => Some(KindRule::Fixed(MirrorEventKind::Remove)),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
    };

    let events = match kind {
        Some(rule) => event
            .paths
            .iter()
            .map(|path| MirrorEvent::new(rule.resolve(path), path.clone()))
            .collect(),
        None => Vec::new(),
    };

    Classification { events, rescan }
}

#[derive(Clone, Copy)]
enum KindRule {
    Fixed(MirrorEventKind),
    ByExistence,
}

impl KindRule {
    fn resolve(self, path: &Path) -> MirrorEventKind {
        match self {
            Self::Fixed(kind) => kind,
            Self::ByExistence if fs::symlink_metadata(path).is_ok() => MirrorEventKind::Create,
            Self::ByExistence => MirrorEventKind::RenameAway,
        }
    }
}
