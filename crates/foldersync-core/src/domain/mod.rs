//! Domain entities
//!
//! This module contains the core domain types for foldersync:
//! - Newtypes for validated relative paths and content fingerprints
//! - Entry kinds as seen by the tree scanner
//! - Sync actions computed and executed during a pass
//! - Domain-specific error types

pub mod action;
pub mod errors;
pub mod newtypes;

// Re-export commonly used types
pub use action::{ActionKind, CopyMode, SyncAction};
pub use errors::DomainError;
pub use newtypes::*;
