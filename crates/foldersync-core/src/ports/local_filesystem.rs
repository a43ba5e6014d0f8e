//! Local filesystem port (driven/secondary port)
//!
//! This module defines the interface the sync engine uses to inspect and
//! mutate the two directory trees. Tree enumeration is not part of the port;
//! it is handled by the read-only scanner in the sync crate.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because filesystem errors are adapter-specific.
//! - All paths are absolute; callers join a `RelativePath` onto a root.
//! - `entry_kind` never follows symlinks and reports a missing path as `None`
//!   instead of an error.

use std::path::Path;

use crate::domain::newtypes::{EntryKind, Fingerprint};

/// Port trait for local filesystem operations
///
/// ## Implementation Notes
///
/// - `fingerprint` must stream the file rather than read it whole.
/// - `copy_file` must preserve modification time and permission bits and
///   must not leave a partially written file under the destination name.
/// - `remove_directory` is recursive.
#[async_trait::async_trait]
pub trait ILocalFileSystem: Send + Sync {
    /// Returns the kind of the entry at `path` without following symlinks
    ///
    /// # Returns
    /// `None` if nothing exists at `path`
    async fn entry_kind(&self, path: &Path) -> anyhow::Result<Option<EntryKind>>;

    /// Computes the content fingerprint of a file
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be read
    async fn fingerprint(&self, path: &Path) -> anyhow::Result<Fingerprint>;

    /// Creates a directory and all parent directories as needed
    ///
    /// This is equivalent to `mkdir -p` behavior.
    async fn create_directory(&self, path: &Path) -> anyhow::Result<()>;

    /// Copies `source` over `destination`, replacing any existing file
    ///
    /// The parent of `destination` must already exist.
    async fn copy_file(&self, source: &Path, destination: &Path) -> anyhow::Result<()>;

    /// Removes a directory and everything below it
    async fn remove_directory(&self, path: &Path) -> anyhow::Result<()>;

    /// Removes a single file or symlink
    async fn remove_file(&self, path: &Path) -> anyhow::Result<()>;
}
