//! Sync actions
//!
//! A [`SyncAction`] is an ephemeral value computed while diffing the two
//! trees. It is executed immediately, reported, and then discarded; actions
//! are never persisted.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::newtypes::RelativePath;

/// Whether a file copy creates a new replica file or replaces a stale one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyMode {
    /// No replica file existed at the destination
    Create,
    /// The replica file existed but its fingerprint differed
    Update,
}

/// Category of an action, used for counters and message labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    DirectoryCreated,
    FileCreated,
    FileUpdated,
    DirectoryRemoved,
    FileRemoved,
}

impl ActionKind {
    /// Human-readable label that prefixes every log message
    pub fn label(self) -> &'static str {
        match self {
            ActionKind::DirectoryCreated => "Directory created",
            ActionKind::FileCreated => "File created",
            ActionKind::FileUpdated => "File updated",
            ActionKind::DirectoryRemoved => "Directory removed",
            ActionKind::FileRemoved => "File removed",
        }
    }
}

impl Display for ActionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One create/update/delete step applied to the replica tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncAction {
    /// Create a directory (and any missing parents) in the replica
    CreateDir {
        relative: RelativePath,
        path: PathBuf,
    },
    /// Copy a source file over the replica path
    CopyFile {
        relative: RelativePath,
        source: PathBuf,
        destination: PathBuf,
        mode: CopyMode,
    },
    /// Recursively remove a replica directory
    RemoveDir {
        relative: RelativePath,
        path: PathBuf,
    },
    /// Remove a single replica file
    RemoveFile {
        relative: RelativePath,
        path: PathBuf,
    },
}

impl SyncAction {
    /// The relative path this action applies to
    pub fn relative(&self) -> &RelativePath {
        match self {
            SyncAction::CreateDir { relative, .. }
            | SyncAction::CopyFile { relative, .. }
            | SyncAction::RemoveDir { relative, .. }
            | SyncAction::RemoveFile { relative, .. } => relative,
        }
    }

    /// The category of this action
    pub fn kind(&self) -> ActionKind {
        match self {
            SyncAction::CreateDir { .. } => ActionKind::DirectoryCreated,
            SyncAction::CopyFile {
                mode: CopyMode::Create,
                ..
            } => ActionKind::FileCreated,
            SyncAction::CopyFile {
                mode: CopyMode::Update,
                ..
            } => ActionKind::FileUpdated,
            SyncAction::RemoveDir { .. } => ActionKind::DirectoryRemoved,
            SyncAction::RemoveFile { .. } => ActionKind::FileRemoved,
        }
    }

    /// The replica path this action modifies
    pub fn target(&self) -> &Path {
        match self {
            SyncAction::CopyFile { destination, .. } => destination,
            SyncAction::CreateDir { path, .. }
            | SyncAction::RemoveDir { path, .. }
            | SyncAction::RemoveFile { path, .. } => path,
        }
    }

    /// Returns true for removals
    pub fn is_removal(&self) -> bool {
        matches!(
            self,
            SyncAction::RemoveDir { .. } | SyncAction::RemoveFile { .. }
        )
    }

    /// Message written to both reporting sinks
    ///
    /// Copies read `"<kind>: <source> to <destination>"`; everything else
    /// reads `"<kind>: <path>"`.
    pub fn message(&self) -> String {
        match self {
            SyncAction::CopyFile {
                source,
                destination,
                ..
            } => format!(
                "{}: {} to {}",
                self.kind(),
                source.display(),
                destination.display()
            ),
            SyncAction::CreateDir { path, .. }
            | SyncAction::RemoveDir { path, .. }
            | SyncAction::RemoveFile { path, .. } => {
                format!("{}: {}", self.kind(), path.display())
            }
        }
    }
}

impl Display for SyncAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}
