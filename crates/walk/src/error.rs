use std::error::Error;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Error returned when a traversal step fails.
#[derive(Debug)]
pub struct WalkError {
    kind: WalkErrorKind,
}

impl WalkError {
    pub(crate) fn new(kind: WalkErrorKind) -> Self {
        Self { kind }
    }

    pub(crate) fn root_metadata(path: PathBuf, source: io::Error) -> Self {
        Self::new(WalkErrorKind::RootMetadata { path, source })
    }

    pub(crate) fn read_dir(path: PathBuf, source: io::Error) -> Self {
        Self::new(WalkErrorKind::ReadDir { path, source })
    }

    pub(crate) fn read_dir_entry(path: PathBuf, source: io::Error) -> Self {
        Self::new(WalkErrorKind::ReadDirEntry { path, source })
    }

    pub(crate) fn metadata(path: PathBuf, source: io::Error) -> Self {
        Self::new(WalkErrorKind::Metadata { path, source })
    }

    pub(crate) fn current_dir(source: io::Error) -> Self {
        Self::new(WalkErrorKind::CurrentDir { source })
    }

    /// Returns the specific failure.
    #[must_use]
    pub fn kind(&self) -> &WalkErrorKind {
        &self.kind
    }

    /// Returns the filesystem path associated with the error.
    ///
    /// # Examples
    ///
    /// ```
    /// use walk::WalkBuilder;
    ///
    /// let error = match WalkBuilder::new("./definitely_missing_root").build() {
    ///     Ok(_) => panic!("missing root yields error"),
    ///     Err(error) => error,
    /// };
    /// assert!(error.path().ends_with("definitely_missing_root"));
    /// ```
    #[must_use]
    pub fn path(&self) -> &Path {
        self.kind.path()
    }

    /// Reports whether the underlying I/O error is `NotFound`.
    ///
    /// Live trees lose entries while they are being walked; callers use this
    /// to tell a vanished directory apart from a real failure.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.io_error().kind() == io::ErrorKind::NotFound
    }

    fn io_error(&self) -> &io::Error {
        match &self.kind {
            WalkErrorKind::RootMetadata { source, .. }
            | WalkErrorKind::ReadDir { source, .. }
            | WalkErrorKind::ReadDirEntry { source, .. }
            | WalkErrorKind::Metadata { source, .. }
            | WalkErrorKind::CurrentDir { source } => source,
        }
    }
}

impl fmt::Display for WalkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            WalkErrorKind::RootMetadata { path, source } => write!(
                f,
                "failed to inspect traversal root '{}': {source}",
                path.display()
            ),
            WalkErrorKind::ReadDir { path, source } => {
                write!(f, "failed to read directory '{}': {source}", path.display())
            }
            WalkErrorKind::ReadDirEntry { path, source } => {
                write!(f, "failed to read entry in '{}': {source}", path.display())
            }
            WalkErrorKind::Metadata { path, source } => write!(
                f,
                "failed to inspect metadata for '{}': {source}",
                path.display()
            ),
            WalkErrorKind::CurrentDir { source } => {
                write!(f, "failed to resolve the working directory: {source}")
            }
        }
    }
}

impl Error for WalkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.io_error())
    }
}

/// Classification of traversal failures.
#[derive(Debug)]
pub enum WalkErrorKind {
    /// Failed to query metadata for the traversal root.
    RootMetadata {
        /// Path that failed to provide metadata.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// Failed to read the contents of a directory.
    ReadDir {
        /// Directory whose contents could not be read.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// Failed to obtain a directory entry during iteration.
    ReadDirEntry {
        /// Directory containing the problematic entry.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// Failed to retrieve metadata for an entry.
    Metadata {
        /// Path whose metadata could not be retrieved.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// A relative root could not be anchored to the working directory.
    CurrentDir {
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
}

impl WalkErrorKind {
    /// Returns the filesystem path tied to the failure.
    ///
    /// [`WalkErrorKind::CurrentDir`] reports `"."`.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::RootMetadata { path, .. }
            | Self::ReadDir { path, .. }
            | Self::ReadDirEntry { path, .. }
            | Self::Metadata { path, .. } => path,
            Self::CurrentDir { .. } => Path::new("."),
        }
    }
}
