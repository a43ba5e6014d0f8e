//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain values.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// Path types
// ============================================================================

/// A validated path relative to the root of a tree
///
/// RelativePath ensures the path is:
/// - Non-empty
/// - Relative (no root or drive prefix)
/// - Free of `.` and `..` components
///
/// The same relative path is joined onto the source root and the replica
/// root to obtain the two locations that are compared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "PathBuf", into = "PathBuf")]
pub struct RelativePath(PathBuf);

impl RelativePath {
    /// Create a new RelativePath, validating its components
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPath` if the path is empty, absolute,
    /// or contains `.`/`..` components
    pub fn new(path: PathBuf) -> Result<Self, DomainError> {
        if path.as_os_str().is_empty() {
            return Err(DomainError::InvalidPath(
                "Relative path cannot be empty".to_string(),
            ));
        }

        for component in path.components() {
            match component {
                Component::Normal(_) => {}
                _ => {
                    return Err(DomainError::InvalidPath(format!(
                        "Path must be relative without traversal: {}",
                        path.display()
                    )));
                }
            }
        }

        Ok(Self(path))
    }

    /// Create a RelativePath by stripping `root` from an absolute `path`
    ///
    /// # Errors
    /// Returns `DomainError::PathNotInRoot` if `path` is not below `root`
    pub fn from_root(root: &Path, path: &Path) -> Result<Self, DomainError> {
        let stripped = path.strip_prefix(root).map_err(|_| {
            DomainError::PathNotInRoot(format!(
                "{} is not within {}",
                path.display(),
                root.display()
            ))
        })?;
        Self::new(stripped.to_path_buf())
    }

    /// Get the inner path reference
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Resolve this relative path against a tree root
    #[must_use]
    pub fn join_onto(&self, root: &Path) -> PathBuf {
        root.join(&self.0)
    }

    /// Number of components (1 for a direct child of the root)
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.components().count()
    }
}

impl Display for RelativePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl TryFrom<PathBuf> for RelativePath {
    type Error = DomainError;

    fn try_from(path: PathBuf) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

impl From<RelativePath> for PathBuf {
    fn from(relative: RelativePath) -> Self {
        relative.0
    }
}

impl AsRef<Path> for RelativePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Lexically normalize a path into an absolute form
///
/// Relative inputs are resolved against `base`. `.` components are dropped
/// and `..` pops the previous component. The filesystem is never consulted,
/// so the path does not need to exist.
///
/// # Errors
/// Returns `DomainError::InvalidPath` if `..` would escape the filesystem root
pub fn normalize_path(path: &Path, base: &Path) -> Result<PathBuf, DomainError> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut normalized = PathBuf::new();

    for component in joined.components() {
        match component {
            Component::Prefix(p) => normalized.push(p.as_os_str()),
            Component::RootDir => normalized.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(DomainError::InvalidPath(
                        "Path escapes root via ..".to_string(),
                    ));
                }
            }
            Component::Normal(c) => normalized.push(c),
        }
    }

    Ok(normalized)
}

// ============================================================================
// Entry kinds
// ============================================================================

/// Kind of a filesystem entry
///
/// Only `Directory` and `File` are ever mirrored. `Symlink` and `Special`
/// (FIFOs, sockets, devices) show up when probing a replica path or
/// walking the replica, so that such entries can be removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A directory (no payload beyond existence)
    Directory,
    /// A regular file
    File,
    /// A symbolic link (never followed)
    Symlink,
    /// Anything else: FIFO, socket, block or character device
    Special,
}

impl EntryKind {
    /// Returns true for `EntryKind::Directory`
    pub fn is_dir(self) -> bool {
        matches!(self, EntryKind::Directory)
    }

    /// Returns true for `EntryKind::File`
    pub fn is_file(self) -> bool {
        matches!(self, EntryKind::File)
    }

    /// Returns true for the kinds the engine copies into the replica
    pub fn is_mirrored(self) -> bool {
        matches!(self, EntryKind::Directory | EntryKind::File)
    }
}

impl Display for EntryKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryKind::Directory => "directory",
            EntryKind::File => "file",
            EntryKind::Symlink => "symlink",
            EntryKind::Special => "special file",
        };
        write!(f, "{s}")
    }
}

// ============================================================================
// Content fingerprint
// ============================================================================

/// SHA-256 digest of a file's full content
///
/// Two files are considered identical iff their fingerprints are equal.
/// Fingerprints are computed on demand and never cached across passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint([u8; Fingerprint::LEN]);

impl Fingerprint {
    /// Digest width in bytes
    pub const LEN: usize = 32;

    /// Wrap raw digest bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw digest bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// Lowercase hex encoding of the digest
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)
            .map_err(|e| DomainError::InvalidFingerprint(format!("{s}: {e}")))?;
        let digest: [u8; Self::LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
            DomainError::InvalidFingerprint(format!(
                "expected {} bytes, got {} bytes",
                Self::LEN,
                b.len()
            ))
        })?;
        Ok(Self(digest))
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Fingerprint> for String {
    fn from(fingerprint: Fingerprint) -> Self {
        fingerprint.to_hex()
    }
}
