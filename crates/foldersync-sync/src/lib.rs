//! foldersync Sync - one-way mirroring engine
//!
//! Provides:
//! - Lazy, deterministic tree scanning
//! - Streaming SHA-256 content fingerprints
//! - Forward (create/update) and reverse (prune) passes
//! - A cancellable periodic scheduler
//!
//! ## Modules
//!
//! - [`scanner`] - Read-only recursive walk producing `(relative path, kind)`
//! - [`fingerprint`] - Chunked SHA-256 of file content
//! - [`filesystem`] - Local filesystem adapter (atomic copies, recursive removal)
//! - [`engine`] - One convergence pass over both trees
//! - [`scheduler`] - Pass / sleep loop driven by a `CancellationToken`

pub mod engine;
pub mod filesystem;
pub mod fingerprint;
pub mod scanner;
pub mod scheduler;

use std::path::PathBuf;

use foldersync_core::domain::DomainError;
use thiserror::Error;

pub use engine::{LoopState, PassReport, SyncEngine};
pub use filesystem::LocalFileSystemAdapter;
pub use scanner::{ScanEntry, TreeScanner};
pub use scheduler::{RunSummary, SyncScheduler};

/// Errors that can occur during synchronization
///
/// Only `Startup` stops the process. Every other variant is caught at the
/// entry where it happened, logged, and the pass continues.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Source missing, replica root cannot be created, log cannot be opened
    #[error("Startup error: {0}")]
    Startup(String),

    /// A directory could not be listed
    #[error("Scan error at {}: {message}", path.display())]
    Scan { path: PathBuf, message: String },

    /// An entry could not be inspected or fingerprinted
    #[error("Read error at {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    /// A create, copy or removal failed
    #[error("Write error at {}: {message}", path.display())]
    Write { path: PathBuf, message: String },

    /// A domain-level error propagated from foldersync-core
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl SyncError {
    /// Whether this error must stop the process rather than one entry
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::Startup(_))
    }
}
