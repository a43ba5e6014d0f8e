//! foldersync Core - Domain types and configuration
//!
//! This crate contains the core shared by the engine and its adapters:
//! - **Domain types** - `RelativePath`, `Fingerprint`, `EntryKind`, `SyncAction`
//! - **Configuration** - `Config`, `ConfigBuilder` and validation
//! - **Port definitions** - `ILocalFileSystem`, implemented by the sync crate
//!
//! # Architecture
//!
//! The domain module is pure data with no I/O. Ports define the trait
//! interfaces that adapter code implements, so the engine can be driven
//! against the real filesystem or a test double.

pub mod config;
pub mod domain;
pub mod ports;
