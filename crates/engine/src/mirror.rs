//! Idempotent filesystem primitives applied to the destination tree.
//!
//! Every operation takes the source path and its already translated
//! destination path. Operations can be repeated safely: copying an unchanged
//! file again yields the same bytes, and deleting a missing path succeeds.

use std::fs::{self, DirBuilder, File};
use std::io;
use std::path::Path;

use logging::{trace_copy, trace_del};

use crate::error::{MirrorAction, MirrorError};

/// What [`TreeMirror::delete_path`] found at the destination.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeleteOutcome {
    /// A file (or symlink) was removed.
    File,
    /// A directory tree was removed.
    Directory,
    /// Nothing existed at the path.
    Missing,
}

impl DeleteOutcome {
    /// Reports whether anything was removed.
    #[must_use]
    pub const fn removed(self) -> bool {
        !matches!(self, Self::Missing)
    }
}

/// Applies create, copy and delete steps to the destination tree.
#[derive(Clone, Copy, Debug)]
pub struct TreeMirror {
    fsync: bool,
}

impl Default for TreeMirror {
    fn default() -> Self {
        Self::new(true)
    }
}

impl TreeMirror {
    /// Creates a mirror; with `fsync` set, copied files are flushed to durable storage.
    #[must_use]
    pub const fn new(fsync: bool) -> Self {
        Self { fsync }
    }

    /// Reports whether copies are flushed to durable storage.
    #[must_use]
    pub const fn fsync(&self) -> bool {
        self.fsync
    }

    /// Creates `dest` (and missing ancestors) with the permission bits of `source`.
    ///
    /// A non-directory already occupying `dest` is replaced.
    pub fn create_dir(&self, source: &Path, dest: &Path) -> Result<(), MirrorError> {
        let metadata =
            fs::metadata(source).map_err(|e| MirrorError::new(MirrorAction::Inspect, source, e))?;

        if let Ok(existing) = fs::symlink_metadata(dest)
            && !existing.is_dir()
        {
            fs::remove_file(dest).map_err(|e| MirrorError::new(MirrorAction::Remove, dest, e))?;
        }

        DirBuilder::new()
            .recursive(true)
            .create(dest)
            .map_err(|e| MirrorError::new(MirrorAction::CreateDir, dest, e))?;
        fs::set_permissions(dest, metadata.permissions())
            .map_err(|e| MirrorError::new(MirrorAction::SetPermissions, dest, e))?;

        trace_copy!("created directory {}", dest.display());
        Ok(())
    }

    /// Copies the contents and permission bits of `source` into `dest`.
    ///
    /// The steps run in sequence (open, create, copy, sync, chmod); a failure
    /// part way leaves a partially written file for the next copy to
    /// overwrite. A source that resolves to a directory is rejected before
    /// the destination is touched. Returns the number of bytes copied.
    pub fn copy_file(&self, source: &Path, dest: &Path) -> Result<u64, MirrorError> {
        let mut reader =
            File::open(source).map_err(|e| MirrorError::new(MirrorAction::Open, source, e))?;
        let metadata = reader
            .metadata()
            .map_err(|e| MirrorError::new(MirrorAction::Inspect, source, e))?;
        if metadata.is_dir() {
            // A symlink to a directory; the destination is left untouched.
            return Err(MirrorError::new(
                MirrorAction::Open,
                source,
                io::Error::from(io::ErrorKind::IsADirectory),
            ));
        }
        let permissions = metadata.permissions();

        clear_destination_for_file(dest)?;

        let mut writer =
            File::create(dest).map_err(|e| MirrorError::new(MirrorAction::Create, dest, e))?;
        let bytes = io::copy(&mut reader, &mut writer)
            .map_err(|e| MirrorError::new(MirrorAction::Copy, dest, e))?;
        if self.fsync {
            writer
                .sync_all()
                .map_err(|e| MirrorError::new(MirrorAction::Sync, dest, e))?;
        }
        drop(writer);
        fs::set_permissions(dest, permissions)
            .map_err(|e| MirrorError::new(MirrorAction::SetPermissions, dest, e))?;

        trace_copy!("copied {} bytes into {}", bytes, dest.display());
        Ok(bytes)
    }

    /// Removes whatever exists at `dest`; directories are removed recursively.
    ///
    /// A path that is already missing is not an error.
    pub fn delete_path(&self, dest: &Path) -> Result<DeleteOutcome, MirrorError> {
        let metadata = match fs::symlink_metadata(dest) {
            Ok(metadata) => metadata,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Ok(DeleteOutcome::Missing);
            }
            Err(error) => return Err(MirrorError::new(MirrorAction::Inspect, dest, error)),
        };

        let (result, outcome) = if metadata.is_dir() {
            (fs::remove_dir_all(dest), DeleteOutcome::Directory)
        } else {
            (fs::remove_file(dest), DeleteOutcome::File)
        };

        match result {
            Ok(()) => {
                trace_del!("deleted {}", dest.display());
                Ok(outcome)
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(DeleteOutcome::Missing),
            Err(error) => Err(MirrorError::new(MirrorAction::Remove, dest, error)),
        }
    }
}

/// Makes room for a regular file at `dest`.
///
/// A directory left behind by a kind change is removed, and a read-only file
/// from an earlier copy is unlinked so it can be recreated.
fn clear_destination_for_file(dest: &Path) -> Result<(), MirrorError> {
    let Ok(existing) = fs::symlink_metadata(dest) else {
        return Ok(());
    };
    let result = if existing.is_dir() {
        fs::remove_dir_all(dest)
    } else if existing.file_type().is_symlink() || existing.permissions().readonly() {
        fs::remove_file(dest)
    } else {
        return Ok(());
    };
    result.map_err(|e| MirrorError::new(MirrorAction::Remove, dest, e))
}
