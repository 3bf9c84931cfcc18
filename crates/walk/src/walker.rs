use crate::entry::WalkEntry;
use crate::error::WalkError;
use logging::trace_walk;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::PathBuf;

/// Depth-first iterator over filesystem entries.
///
/// Directory contents are listed lazily: a directory yielded by
/// [`Iterator::next`] is only opened on the following call, so
/// [`skip_subtree`](Self::skip_subtree) can prune it first.
#[derive(Debug)]
pub struct Walker {
    root: PathBuf,
    max_depth: Option<usize>,
    root_entry: Option<WalkEntry>,
    stack: Vec<DirectoryState>,
    pending: Option<PendingDirectory>,
}

#[derive(Debug)]
struct PendingDirectory {
    fs_path: PathBuf,
    relative_path: PathBuf,
    depth: usize,
}

impl Walker {
    pub(crate) fn new(
        root: PathBuf,
        include_root: bool,
        max_depth: Option<usize>,
    ) -> Result<Self, WalkError> {
        let root = absolutize(root)?;
        trace_walk!("walking {}", root.display());

        let metadata = fs::symlink_metadata(&root)
            .map_err(|error| WalkError::root_metadata(root.clone(), error))?;

        let mut stack = Vec::new();
        if metadata.file_type().is_dir() && max_depth != Some(0) {
            stack.push(DirectoryState::new(root.clone(), PathBuf::new(), 0)?);
        }

        let root_entry = include_root.then(|| WalkEntry {
            full_path: root.clone(),
            relative_path: PathBuf::new(),
            metadata,
            depth: 0,
            is_root: true,
        });

        Ok(Self {
            root,
            max_depth,
            root_entry,
            stack,
            pending: None,
        })
    }

    /// Returns the absolute root of the traversal.
    #[must_use]
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Prevents the walker from descending into the directory it yielded last.
    ///
    /// Has no effect when the last entry was not a directory, or when it was
    /// the root (whose listing is read eagerly by [`crate::WalkBuilder::build`]).
    pub fn skip_subtree(&mut self) {
        if let Some(pending) = self.pending.take() {
            trace_walk!("pruned {}", pending.fs_path.display());
        }
    }

    fn descend_pending(&mut self) -> Result<(), WalkError> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };

        match DirectoryState::new(pending.fs_path, pending.relative_path, pending.depth) {
            Ok(state) => {
                self.stack.push(state);
                Ok(())
            }
            Err(error) if error.is_not_found() => {
                trace_walk!("directory vanished before listing: {}", error.path().display());
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    fn may_descend(&self, depth: usize) -> bool {
        self.max_depth.is_none_or(|max| depth < max)
    }
}

impl Iterator for Walker {
    type Item = Result<WalkEntry, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(entry) = self.root_entry.take() {
            return Some(Ok(entry));
        }

        if let Err(error) = self.descend_pending() {
            return Some(Err(error));
        }

        loop {
            let state = self.stack.last_mut()?;
            let Some(name) = state.next_name() else {
                self.stack.pop();
                continue;
            };

            let full_path = state.fs_path.join(&name);
            let relative_path = state.relative_prefix.join(&name);
            let depth = state.depth + 1;

            match fs::symlink_metadata(&full_path) {
                Ok(metadata) => {
                    if metadata.file_type().is_dir() && self.may_descend(depth) {
                        self.pending = Some(PendingDirectory {
                            fs_path: full_path.clone(),
                            relative_path: relative_path.clone(),
                            depth,
                        });
                    }
                    return Some(Ok(WalkEntry {
                        full_path,
                        relative_path,
                        metadata,
                        depth,
                        is_root: false,
                    }));
                }
                Err(error) if error.kind() == io::ErrorKind::NotFound => {
                    trace_walk!("entry vanished during walk: {}", full_path.display());
                }
                Err(error) => return Some(Err(WalkError::metadata(full_path, error))),
            }
        }
    }
}

#[derive(Clone, Debug)]
struct DirectoryState {
    fs_path: PathBuf,
    relative_prefix: PathBuf,
    entries: Vec<OsString>,
    index: usize,
    depth: usize,
}

impl DirectoryState {
    fn new(fs_path: PathBuf, relative_prefix: PathBuf, depth: usize) -> Result<Self, WalkError> {
        let read_dir =
            fs::read_dir(&fs_path).map_err(|error| WalkError::read_dir(fs_path.clone(), error))?;
        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|error| WalkError::read_dir_entry(fs_path.clone(), error))?;
            entries.push(entry.file_name());
        }
        entries.sort();

        Ok(Self {
            fs_path,
            relative_prefix,
            entries,
            index: 0,
            depth,
        })
    }

    fn next_name(&mut self) -> Option<OsString> {
        let name = self.entries.get(self.index)?.clone();
        self.index += 1;
        Some(name)
    }
}

fn absolutize(path: PathBuf) -> Result<PathBuf, WalkError> {
    if path.is_absolute() {
        Ok(path)
    } else {
        let cwd = env::current_dir().map_err(WalkError::current_dir)?;
        Ok(cwd.join(path))
    }
}
