//! Local filesystem adapter (secondary/driven adapter)
//!
//! Implements [`ILocalFileSystem`] using `tokio::fs` for async file operations.
//!
//! ## Design Decisions
//!
//! - **Atomic copies**: Content is copied to a hidden temporary sibling,
//!   stamped with the source modification time, then renamed over the
//!   destination. A crash never leaves a half-written file under the real
//!   name.
//! - **Temporary names**: `.foldersync-XXXXXX.tmp`, created exclusively with
//!   a random part. The length does not depend on the destination name and
//!   an existing file is never reused.
//! - **Metadata**: `tokio::fs::copy` carries permission bits; the
//!   modification time is set from a blocking thread.
//! - **No symlink following**: `entry_kind` uses `symlink_metadata`.

use std::io::ErrorKind;
use std::path::Path;

use anyhow::{anyhow, Context};
use foldersync_core::{
    domain::newtypes::{EntryKind, Fingerprint},
    ports::local_filesystem::ILocalFileSystem,
};
use tempfile::{NamedTempFile, TempPath};
use tracing::{debug, instrument};

use crate::fingerprint::fingerprint_file;

/// Prefix of in-flight copy files
const TEMP_PREFIX: &str = ".foldersync-";

/// Suffix of in-flight copy files
const TEMP_SUFFIX: &str = ".tmp";

// ============================================================================
// LocalFileSystemAdapter struct
// ============================================================================

/// Adapter that bridges the [`ILocalFileSystem`] port to the real filesystem.
///
/// This is a zero-sized struct because all operations receive absolute
/// paths. The two tree roots live in the engine.
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystemAdapter;

impl LocalFileSystemAdapter {
    /// Create a new `LocalFileSystemAdapter`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Creates an empty temporary file next to `destination`
///
/// The returned path deletes the file when dropped, unless persisted.
async fn create_temp_beside(destination: &Path) -> anyhow::Result<TempPath> {
    let parent = match destination.parent() {
        Some(p) if p.as_os_str().is_empty() => Path::new("."),
        Some(p) => p,
        None => return Err(anyhow!("Destination has no parent: {}", destination.display())),
    }
    .to_path_buf();

    tokio::task::spawn_blocking(move || {
        tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(&parent)
            .map(NamedTempFile::into_temp_path)
            .with_context(|| format!("Failed to create temporary file in {}", parent.display()))
    })
    .await
    .context("Temporary file task panicked")?
}

/// Copy content and metadata from `source` to `temp`
async fn copy_to_temp(source: &Path, temp: &Path) -> anyhow::Result<()> {
    // Also copies permission bits
    tokio::fs::copy(source, temp)
        .await
        .with_context(|| format!("Failed to copy {}", source.display()))?;

    let modified = tokio::fs::metadata(source)
        .await
        .and_then(|m| m.modified())
        .with_context(|| format!("Failed to read modification time of {}", source.display()))?;

    let temp_owned = temp.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&temp_owned)?;
        file.set_modified(modified)
    })
    .await
    .context("Timestamp task panicked")?
    .with_context(|| format!("Failed to set modification time on {}", temp.display()))?;

    Ok(())
}

// ============================================================================
// ILocalFileSystem implementation
// ============================================================================

#[async_trait::async_trait]
impl ILocalFileSystem for LocalFileSystemAdapter {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn entry_kind(&self, path: &Path) -> anyhow::Result<Option<EntryKind>> {
        let metadata = match tokio::fs::symlink_metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to inspect {}", path.display())))
            }
        };

        let file_type = metadata.file_type();
        let kind = if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Special
        };
        Ok(Some(kind))
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn fingerprint(&self, path: &Path) -> anyhow::Result<Fingerprint> {
        let fingerprint = fingerprint_file(path)
            .await
            .with_context(|| format!("Failed to fingerprint {}", path.display()))?;
        debug!(%fingerprint, "fingerprint computed");
        Ok(fingerprint)
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn create_directory(&self, path: &Path) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(path)
            .await
            .with_context(|| format!("Failed to create directory {}", path.display()))
    }

    #[instrument(skip(self), fields(source = %source.display(), destination = %destination.display()))]
    async fn copy_file(&self, source: &Path, destination: &Path) -> anyhow::Result<()> {
        // Dropping `temp` on any early return removes the file
        let temp = create_temp_beside(destination).await?;

        debug!(temp = %temp.display(), "copying to temporary file");
        copy_to_temp(source, &temp).await?;

        debug!("renaming temporary file over destination");
        let target = destination.to_path_buf();
        tokio::task::spawn_blocking(move || temp.persist(&target).map_err(|e| e.error))
            .await
            .context("Rename task panicked")?
            .with_context(|| format!("Failed to replace {}", destination.display()))
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn remove_directory(&self, path: &Path) -> anyhow::Result<()> {
        tokio::fs::remove_dir_all(path)
            .await
            .with_context(|| format!("Failed to remove directory {}", path.display()))
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn remove_file(&self, path: &Path) -> anyhow::Result<()> {
        tokio::fs::remove_file(path)
            .await
            .with_context(|| format!("Failed to remove {}", path.display()))
    }
}
