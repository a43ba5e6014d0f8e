//! foldersync Audit - Action log and live notices
//!
//! Provides:
//! - `ActionLog`: single reporting call that fans out to every sink
//! - `LogRecord`: timestamped action or error line
//! - Sinks: `FileSink` (durable, append-only), `ConsoleSink` (live notices),
//!   `MemorySink` (in-memory, for tests)

pub mod logger;
pub mod record;
pub mod sink;

use std::path::PathBuf;

use thiserror::Error;

pub use logger::ActionLog;
pub use record::{LogRecord, Severity};
pub use sink::{ConsoleSink, FileSink, LogSink, MemorySink, NoticeFormat};

/// Errors raised while opening or writing a log sink
#[derive(Debug, Error)]
pub enum AuditError {
    /// The directory that should hold the log file could not be created
    #[error("Failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The log file could not be opened for appending
    #[error("Failed to open log file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be written
    #[error("Failed to write log record: {0}")]
    Write(#[from] std::io::Error),

    /// A JSON notice could not be encoded
    #[error("Failed to encode notice: {0}")]
    Encode(#[from] serde_json::Error),

    /// Unknown notice format name
    #[error("Unknown notice format: {0}")]
    UnknownFormat(String),
}
