//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! mostly validation failures for paths and fingerprints.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid path format or content
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Path is not located under the expected root
    #[error("Path not within root: {0}")]
    PathNotInRoot(String),

    /// Invalid fingerprint (expected a hex-encoded SHA-256 digest)
    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),
}
