//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are interfaces that the sync engine depends on, but whose
//! implementations live in adapter code.
//!
//! ## Ports Overview
//!
//! - [`ILocalFileSystem`] - Probing, fingerprinting, copying and removing entries

pub mod local_filesystem;

pub use local_filesystem::ILocalFileSystem;
