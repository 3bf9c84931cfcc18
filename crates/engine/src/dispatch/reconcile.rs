//! Reconciliation walks.
//!
//! A reconciliation first removes destination entries that no longer match
//! the source (missing, or a file where a directory is expected and the
//! other way round), then walks the source creating directories, copying
//! files and registering watches. It runs at start-up, after the watch
//! mechanism reports dropped events, and (limited to one new directory) when
//! a directory appears while the agent runs.

use std::fs;
use std::io;
use std::path::Path;

use logging::trace_walk;
use walk::{WalkBuilder, Walker};

use super::Dispatcher;
use crate::error::StartError;

/// Counters describing one reconciliation walk.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ReconcileSummary {
    /// Stale destination entries removed.
    pub removed: u64,
    /// Destination directories created or confirmed.
    pub directories_created: u64,
    /// Files copied.
    pub files_copied: u64,
    /// Directories that became watched.
    pub watches_registered: u64,
    /// Failures reported and skipped.
    pub failures: u64,
}

/// How a rejected watch registration is treated.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum WatchFailurePolicy {
    /// Fail the walk. Used while starting.
    Abort,
    /// Report and keep going; the directory is mirrored once but not kept live.
    Skip,
}

impl Dispatcher {
    /// Runs a full reconciliation of the destination against the source.
    pub(crate) fn reconcile(
        &mut self,
        policy: WatchFailurePolicy,
    ) -> Result<ReconcileSummary, StartError> {
        let mut summary = ReconcileSummary::default();
        self.prune_destination(&mut summary)?;
        let root = self.translator.source_root().to_path_buf();
        self.populate(&root, policy, &mut summary)?;
        trace_walk!(?summary, "reconciled {}", root.display());
        Ok(summary)
    }

    /// Mirrors a directory that appeared while running, together with
    /// anything already inside it, and watches it before listing it.
    pub(crate) fn seed_directory(&mut self, dir: &Path) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();
        if let Err(error) = self.populate(dir, WatchFailurePolicy::Skip, &mut summary) {
            summary.failures += 1;
            self.report_error(&error);
        }
        summary
    }

    /// Reconciles after the watch mechanism dropped events.
    pub(crate) fn rescan(&mut self) {
        self.stats.rescans += 1;
        trace_walk!("rescanning after dropped events");
        if let Err(error) = self.reconcile(WatchFailurePolicy::Skip) {
            self.report_error(&error);
        }
    }

    fn prune_destination(&mut self, summary: &mut ReconcileSummary) -> Result<(), StartError> {
        let mut walker = WalkBuilder::new(self.translator.dest_root())
            .include_root(false)
            .max_depth(self.options.walk_depth())
            .build()?;

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    summary.failures += 1;
                    self.report_error(&error);
                    continue;
                }
            };
            let source = match self.translator.to_source(entry.full_path()) {
                Ok(source) => source,
                Err(error) => {
                    summary.failures += 1;
                    self.report_error(&error);
                    continue;
                }
            };

            let stale = match fs::symlink_metadata(&source) {
                Ok(metadata) => metadata.is_dir() != entry.is_dir(),
                Err(error) if error.kind() == io::ErrorKind::NotFound => true,
                Err(error) => {
                    summary.failures += 1;
                    self.report_error(&format_args!(
                        "failed to inspect '{}': {error}",
                        source.display()
                    ));
                    false
                }
            };
            if !stale {
                continue;
            }

            if entry.is_dir() {
                walker.skip_subtree();
            }
            let (_, failures) = self.registry.unregister_subtree(&source);
            for failure in failures {
                self.report_error(&failure);
            }
            match self.mirror.delete_path(entry.full_path()) {
                Ok(outcome) if outcome.removed() => summary.removed += 1,
                Ok(_) => {}
                Err(error) => {
                    summary.failures += 1;
                    self.report_error(&error);
                }
            }
        }
        Ok(())
    }

    /// Mirrors `dir` and its contents. `dir` is created and watched before it
    /// is listed so entries created meanwhile are reported by the new watch.
    fn populate(
        &mut self,
        dir: &Path,
        policy: WatchFailurePolicy,
        summary: &mut ReconcileSummary,
    ) -> Result<(), StartError> {
        let is_root = dir == self.translator.source_root();
        let dest = match self.translator.to_destination(dir) {
            Ok(dest) => dest,
            Err(error) => {
                summary.failures += 1;
                self.report_error(&error);
                return Ok(());
            }
        };

        match self.mirror.create_dir(dir, &dest) {
            Ok(()) if is_root => {}
            Ok(()) => summary.directories_created += 1,
            Err(error) => {
                if !error.source_vanished() {
                    summary.failures += 1;
                }
                self.report_mirror_error(&error);
                return Ok(());
            }
        }
        if is_root || self.options.is_recursive() {
            self.register_watch(dir, policy, summary)?;
        }

        let depth = if is_root {
            self.options.walk_depth()
        } else {
            None
        };
        let Some(mut walker) = self.open_walk(dir, depth, is_root, policy, summary)? else {
            return Ok(());
        };

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    summary.failures += 1;
                    self.report_error(&error);
                    continue;
                }
            };
            let source = entry.full_path();
            let dest = match self.translator.to_destination(source) {
                Ok(dest) => dest,
                Err(error) => {
                    summary.failures += 1;
                    self.report_error(&error);
                    continue;
                }
            };

            if entry.is_dir() {
                if let Err(error) = self.mirror.create_dir(source, &dest) {
                    if !error.source_vanished() {
                        summary.failures += 1;
                    }
                    self.report_mirror_error(&error);
                    walker.skip_subtree();
                    continue;
                }
                summary.directories_created += 1;
                if self.options.is_recursive() {
                    self.register_watch(source, policy, summary)?;
                }
            } else {
                match self.mirror.copy_file(source, &dest) {
                    Ok(_) => summary.files_copied += 1,
                    Err(error) => {
                        if !error.source_vanished() {
                            summary.failures += 1;
                        }
                        self.report_mirror_error(&error);
                    }
                }
            }
        }
        Ok(())
    }

    fn open_walk(
        &mut self,
        dir: &Path,
        depth: Option<usize>,
        is_root: bool,
        policy: WatchFailurePolicy,
        summary: &mut ReconcileSummary,
    ) -> Result<Option<Walker>, StartError> {
        match WalkBuilder::new(dir)
            .include_root(false)
            .max_depth(depth)
            .build()
        {
            Ok(walker) => Ok(Some(walker)),
            Err(error) if !is_root && error.is_not_found() => {
                trace_walk!("directory vanished before seeding: {}", dir.display());
                Ok(None)
            }
            Err(error) if policy == WatchFailurePolicy::Abort => Err(error.into()),
            Err(error) => {
                summary.failures += 1;
                self.report_error(&error);
                Ok(None)
            }
        }
    }

    fn register_watch(
        &mut self,
        dir: &Path,
        policy: WatchFailurePolicy,
        summary: &mut ReconcileSummary,
    ) -> Result<(), StartError> {
        if self.registry.contains(dir) {
            return Ok(());
        }
        match self.registry.register(dir) {
            Ok(_) => {
                summary.watches_registered += 1;
                Ok(())
            }
            Err(error) => match policy {
                WatchFailurePolicy::Abort => Err(error.into()),
                WatchFailurePolicy::Skip => {
                    summary.failures += 1;
                    self.report_error(&error);
                    Ok(())
                }
            },
        }
    }
}
