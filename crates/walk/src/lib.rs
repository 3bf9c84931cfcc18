#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `walk` provides the deterministic depth-first traversal used by the lsync
//! mirror engine when it reconciles a destination tree against its source and
//! when it seeds a freshly created directory. Directory entries are sorted
//! lexicographically before they are yielded, so two walks over identical
//! trees produce identical sequences.
//!
//! # Design
//!
//! - [`WalkBuilder`] configures the root, whether the root itself is yielded,
//!   and an optional depth limit.
//! - [`Walker`] implements [`Iterator`] and yields [`WalkEntry`] values.
//!   Descent into a directory is deferred until the next call to
//!   [`Iterator::next`], which lets callers prune a subtree with
//!   [`Walker::skip_subtree`] after inspecting (or deleting) the directory.
//! - [`WalkError`] describes I/O failures and carries the offending path.
//!
//! # Invariants
//!
//! - Yielded paths always reside within the configured root and relative paths
//!   never contain `..` segments.
//! - Symbolic links are reported as entries but never followed, so the walk
//!   cannot cycle.
//! - Only failures on the root are fatal. A directory that cannot be read
//!   produces one error item and the walk continues with its siblings. Entries
//!   that disappear between listing and inspection are skipped silently, since
//!   the trees being walked are live.
//!
//! # Examples
//!
//! ```
//! use walk::WalkBuilder;
//! use std::fs;
//!
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let temp = tempfile::tempdir()?;
//! let root = temp.path().join("src");
//! fs::create_dir_all(root.join("nested"))?;
//! fs::write(root.join("file.txt"), b"data")?;
//! fs::write(root.join("nested/more.txt"), b"data")?;
//!
//! let mut seen = Vec::new();
//! for entry in WalkBuilder::new(&root).include_root(false).build()? {
//!     seen.push(entry?.relative_path().to_path_buf());
//! }
//!
//! assert_eq!(
//!     seen,
//!     ["file.txt", "nested", "nested/more.txt"].map(std::path::PathBuf::from)
//! );
//! # Ok(())
//! # }
//! # demo().unwrap();
//! ```

mod builder;
mod entry;
mod error;
mod walker;

pub use builder::WalkBuilder;
pub use entry::WalkEntry;
pub use error::{WalkError, WalkErrorKind};
pub use walker::Walker;
