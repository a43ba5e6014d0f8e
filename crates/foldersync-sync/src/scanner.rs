//! Tree scanner
//!
//! Walks one directory tree and yields `(relative path, kind)` pairs lazily,
//! in pre-order, sorted by file name within each directory. The scanner only
//! reads; it knows nothing about the other tree or about sync decisions.
//!
//! Symlinks are never followed, so cycles are impossible. By default they are
//! not yielded either, nor are special files; a replica walk asks for them
//! with [`TreeScanner::include_unmirrored`] so they can be pruned.
//! An unreadable subdirectory produces one `SyncError::Scan` item and the walk
//! carries on with its siblings.

use std::path::{Path, PathBuf};

use foldersync_core::domain::{EntryKind, RelativePath};
use tracing::debug;
use walkdir::WalkDir;

use crate::SyncError;

/// One entry found below the scanned root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    /// Path relative to the scanned root
    pub relative: RelativePath,
    /// Directory or file, unless unmirrored entries were requested
    pub kind: EntryKind,
    /// Absolute location inside the scanned tree
    pub path: PathBuf,
}

/// Lazy recursive walk over a directory tree
///
/// Reads the directory with blocking `std::fs` calls on the calling thread.
/// The engine runs on a single-threaded runtime and checks for cancellation
/// between entries, so a signal is handled at the next yielded entry.
pub struct TreeScanner {
    root: PathBuf,
    walker: walkdir::IntoIter,
    unmirrored: bool,
}

impl TreeScanner {
    /// Starts a walk below `root`
    ///
    /// # Errors
    /// Returns `SyncError::Scan` if `root` is missing or not a directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, SyncError> {
        let root = root.into();

        let metadata = std::fs::metadata(&root).map_err(|e| SyncError::Scan {
            path: root.clone(),
            message: e.to_string(),
        })?;
        if !metadata.is_dir() {
            return Err(SyncError::Scan {
                path: root,
                message: "not a directory".to_string(),
            });
        }

        let walker = WalkDir::new(&root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        Ok(Self {
            root,
            walker,
            unmirrored: false,
        })
    }

    /// Also yield symlinks (`EntryKind::Symlink`) and FIFOs, sockets and
    /// devices (`EntryKind::Special`)
    #[must_use]
    pub fn include_unmirrored(mut self) -> Self {
        self.unmirrored = true;
        self
    }

    /// The scanned root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Do not descend into the directory entry most recently yielded
    ///
    /// Must only be called right after a `Directory` entry was returned.
    pub fn skip_subtree(&mut self) {
        self.walker.skip_current_dir();
    }
}

impl Iterator for TreeScanner {
    type Item = Result<ScanEntry, SyncError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    return Some(Err(SyncError::Scan {
                        path,
                        message: err.to_string(),
                    }));
                }
            };

            let file_type = entry.file_type();
            let kind = if file_type.is_symlink() {
                EntryKind::Symlink
            } else if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                EntryKind::Special
            };

            if !kind.is_mirrored() && !self.unmirrored {
                debug!(path = %entry.path().display(), %kind, "Skipping unmirrored entry");
                continue;
            }

            let relative = match RelativePath::from_root(&self.root, entry.path()) {
                Ok(relative) => relative,
                Err(e) => return Some(Err(e.into())),
            };

            return Some(Ok(ScanEntry {
                relative,
                kind,
                path: entry.into_path(),
            }));
        }
    }
}
