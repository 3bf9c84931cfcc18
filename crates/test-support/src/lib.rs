//! Shared test utilities for the lsync workspace.
//!
//! [`TestTree`] owns a temporary directory holding a `src` and a `dest`
//! tree, with helpers addressed by paths relative to those roots.
//! [`wait_until`] polls a condition, which is how tests observe the
//! asynchronous effects of filesystem notifications.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

/// Upper bound for waits on notification-driven effects.
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Polls `condition` until it holds or `timeout` elapses.
///
/// Returns the final value of the condition.
pub fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return condition();
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Temporary `src`/`dest` pair with canonical root paths.
#[derive(Debug)]
pub struct TestTree {
    _temp: TempDir,
    src: PathBuf,
    dest: PathBuf,
}

impl TestTree {
    /// Creates empty `src` and `dest` directories inside a fresh temp dir.
    pub fn new() -> io::Result<Self> {
        let temp = tempfile::tempdir()?;
        let root = fs::canonicalize(temp.path())?;
        let src = root.join("src");
        let dest = root.join("dest");
        fs::create_dir(&src)?;
        fs::create_dir(&dest)?;
        Ok(Self {
            _temp: temp,
            src,
            dest,
        })
    }

    /// Canonical path of the source root.
    #[must_use]
    pub fn src(&self) -> &Path {
        &self.src
    }

    /// Canonical path of the destination root.
    #[must_use]
    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Absolute path of `relative` under the source root.
    #[must_use]
    pub fn src_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.src.join(relative)
    }

    /// Absolute path of `relative` under the destination root.
    #[must_use]
    pub fn dest_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.dest.join(relative)
    }

    /// Writes a source file, creating missing parent directories.
    pub fn write_src(&self, relative: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> io::Result<PathBuf> {
        write_creating_parents(&self.src_path(relative), contents.as_ref())
    }

    /// Writes a destination file, creating missing parent directories.
    pub fn write_dest(&self, relative: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> io::Result<PathBuf> {
        write_creating_parents(&self.dest_path(relative), contents.as_ref())
    }

    /// Creates a source directory and its missing parents.
    pub fn mkdir_src(&self, relative: impl AsRef<Path>) -> io::Result<PathBuf> {
        let path = self.src_path(relative);
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Creates a destination directory and its missing parents.
    pub fn mkdir_dest(&self, relative: impl AsRef<Path>) -> io::Result<PathBuf> {
        let path = self.dest_path(relative);
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Removes a source file or directory tree.
    pub fn remove_src(&self, relative: impl AsRef<Path>) -> io::Result<()> {
        let path = self.src_path(relative);
        if fs::symlink_metadata(&path)?.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        }
    }

    /// Reads a destination file, returning `None` when it does not exist.
    #[must_use]
    pub fn read_dest(&self, relative: impl AsRef<Path>) -> Option<Vec<u8>> {
        fs::read(self.dest_path(relative)).ok()
    }

    /// Reports whether anything exists at `relative` under the destination.
    #[must_use]
    pub fn dest_exists(&self, relative: impl AsRef<Path>) -> bool {
        fs::symlink_metadata(self.dest_path(relative)).is_ok()
    }

    /// Waits until the destination file holds exactly `expected`.
    #[must_use]
    pub fn wait_for_dest_contents(&self, relative: impl AsRef<Path>, expected: impl AsRef<[u8]>) -> bool {
        let relative = relative.as_ref();
        let expected = expected.as_ref();
        wait_until(SETTLE_TIMEOUT, || {
            self.read_dest(relative).as_deref() == Some(expected)
        })
    }

    /// Waits until nothing exists at `relative` under the destination.
    #[must_use]
    pub fn wait_for_dest_absent(&self, relative: impl AsRef<Path>) -> bool {
        let relative = relative.as_ref();
        wait_until(SETTLE_TIMEOUT, || !self.dest_exists(relative))
    }
}

fn write_creating_parents(path: &Path, contents: &[u8]) -> io::Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(path.to_path_buf())
}
