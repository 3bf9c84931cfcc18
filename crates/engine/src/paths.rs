//! Mapping between the source and destination coordinate spaces.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PathResolutionError;

/// Resolves `path` to an absolute path with every symlink expanded.
///
/// Fails when the path does not exist or a symlink cycle is encountered.
pub fn resolve(path: impl AsRef<Path>) -> Result<PathBuf, PathResolutionError> {
    let path = path.as_ref();
    fs::canonicalize(path).map_err(|error| PathResolutionError::resolve(path, error))
}

/// Returns `target` relative to `base`.
///
/// Both paths must already be in the same form (see [`resolve`]); no
/// filesystem access is performed. `base` relative to itself is the empty
/// path.
pub fn relative_to(base: &Path, target: &Path) -> Result<PathBuf, PathResolutionError> {
    target
        .strip_prefix(base)
        .map(Path::to_path_buf)
        .map_err(|_| PathResolutionError::Unreachable {
            base: base.to_path_buf(),
            target: target.to_path_buf(),
        })
}

/// Translates paths between a resolved source root and destination root.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathTranslator {
    source_root: PathBuf,
    dest_root: PathBuf,
}

impl PathTranslator {
    /// Builds a translator over two already-resolved roots.
    pub fn new(source_root: impl Into<PathBuf>, dest_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            dest_root: dest_root.into(),
        }
    }

    /// Returns the source root.
    #[must_use]
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Returns the destination root.
    #[must_use]
    pub fn dest_root(&self) -> &Path {
        &self.dest_root
    }

    /// Maps a source path to its mirrored destination path.
    pub fn to_destination(&self, source: &Path) -> Result<PathBuf, PathResolutionError> {
        let relative = relative_to(&self.source_root, source)?;
        Ok(join_relative(&self.dest_root, &relative))
    }

    /// Maps a destination path back to the source path it mirrors.
    pub fn to_source(&self, dest: &Path) -> Result<PathBuf, PathResolutionError> {
        let relative = relative_to(&self.dest_root, dest)?;
        Ok(join_relative(&self.source_root, &relative))
    }

    /// Reports whether `source` is a direct child of the source root.
    #[must_use]
    pub fn is_direct_child(&self, source: &Path) -> bool {
        source.parent() == Some(self.source_root.as_path())
    }
}

fn join_relative(root: &Path, relative: &Path) -> PathBuf {
    if relative.as_os_str().is_empty() {
        root.to_path_buf()
    } else {
        root.join(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translator() -> PathTranslator {
        PathTranslator::new("/data/src", "/backup/dest")
    }

    #[test]
    fn relative_to_strips_the_base() {
        let relative = relative_to(Path::new("/data/src"), Path::new("/data/src/a/b.txt"))
            .expect("path below base");
        assert_eq!(relative, PathBuf::from("a/b.txt"));

        let same = relative_to(Path::new("/data/src"), Path::new("/data/src")).expect("base");
        assert!(same.as_os_str().is_empty());
    }

    #[test]
    fn relative_to_rejects_paths_outside_base() {
        let error = relative_to(Path::new("/data/src"), Path::new("/data/srcfile"))
            .expect_err("sibling with shared prefix is outside");
        assert!(matches!(error, PathResolutionError::Unreachable { .. }));
    }

    #[test]
    fn translator_maps_both_directions() {
        let translator = translator();
        let dest = translator
            .to_destination(Path::new("/data/src/a/b.txt"))
            .expect("source path");
        assert_eq!(dest, PathBuf::from("/backup/dest/a/b.txt"));

        let source = translator.to_source(&dest).expect("dest path");
        assert_eq!(source, PathBuf::from("/data/src/a/b.txt"));

        let root = translator
            .to_destination(Path::new("/data/src"))
            .expect("root");
        assert_eq!(root, PathBuf::from("/backup/dest"));
    }

    #[test]
    fn direct_child_check() {
        let translator = translator();
        assert!(translator.is_direct_child(Path::new("/data/src/a")));
        assert!(!translator.is_direct_child(Path::new("/data/src/a/b")));
        assert!(!translator.is_direct_child(Path::new("/data/src")));
    }

    #[test]
    fn resolve_reports_missing_paths() {
        let temp = tempfile::tempdir().expect("tempdir");
        let missing = temp.path().join("missing");
        let error = resolve(&missing).expect_err("missing path");
        match error {
            PathResolutionError::Resolve { path, source } => {
                assert_eq!(path, missing);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn resolve_expands_symlinks() {
        let temp = tempfile::tempdir().expect("tempdir");
        let target = temp.path().join("target");
        fs::create_dir(&target).expect("create target");
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(&target, &link).expect("symlink");

        let resolved = resolve(&link).expect("resolve link");
        assert_eq!(resolved, fs::canonicalize(&target).expect("canonical target"));
    }

    #[cfg(unix)]
    #[test]
    fn resolve_fails_on_symlink_cycle() {
        let temp = tempfile::tempdir().expect("tempdir");
        let a = temp.path().join("a");
        let b = temp.path().join("b");
        std::os::unix::fs::symlink(&b, &a).expect("symlink a");
        std::os::unix::fs::symlink(&a, &b).expect("symlink b");

        assert!(resolve(&a).is_err());
    }
}
