/// Behaviour switches for a [`WatchAgent`](crate::WatchAgent).
///
/// Built with consuming setters:
///
/// ```
/// use engine::AgentOptions;
///
/// let options = AgentOptions::new().recursive(true).verbose(true);
/// assert!(options.is_recursive());
/// assert!(options.fsync_enabled());
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AgentOptions {
    recursive: bool,
    verbose: bool,
    fsync: bool,
    rescan_on_overflow: bool,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentOptions {
    /// Non-recursive, quiet, with fsync and overflow rescans enabled.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            recursive: false,
            verbose: false,
            fsync: true,
            rescan_on_overflow: true,
        }
    }

    /// Mirrors and watches the whole source tree instead of its direct children.
    #[must_use]
    pub const fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Reports every handled event through the output sink.
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Flushes copied files to durable storage before setting permissions.
    #[must_use]
    pub const fn fsync(mut self, fsync: bool) -> Self {
        self.fsync = fsync;
        self
    }

    /// Runs a reconciliation walk when the watch mechanism reports dropped events.
    #[must_use]
    pub const fn rescan_on_overflow(mut self, rescan: bool) -> Self {
        self.rescan_on_overflow = rescan;
        self
    }

    /// Reports whether the whole tree is mirrored.
    #[must_use]
    pub const fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Reports whether handled events are echoed to the sink.
    #[must_use]
    pub const fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Reports whether copies are flushed to durable storage.
    #[must_use]
    pub const fn fsync_enabled(&self) -> bool {
        self.fsync
    }

    /// Reports whether overflow triggers a reconciliation walk.
    #[must_use]
    pub const fn rescans_on_overflow(&self) -> bool {
        self.rescan_on_overflow
    }

    /// Depth bound applied to reconciliation walks.
    pub(crate) const fn walk_depth(&self) -> Option<usize> {
        if self.recursive { None } else { Some(1) }
    }
}
