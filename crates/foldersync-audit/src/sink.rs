//! Log sinks
//!
//! A sink receives every [`LogRecord`] the [`ActionLog`](crate::ActionLog)
//! dispatches. The durable [`FileSink`] and the live [`ConsoleSink`] are
//! wired together at startup; [`MemorySink`] lets tests observe exactly what
//! was reported.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use serde_json::json;
use tracing::debug;

use crate::record::{LogRecord, Severity};
use crate::AuditError;

/// Destination for log records
pub trait LogSink: Send + Sync {
    /// Short name used in diagnostics
    fn name(&self) -> &'static str;

    /// Writes one record
    fn write(&self, record: &LogRecord) -> Result<(), AuditError>;
}

// ============================================================================
// FileSink
// ============================================================================

/// Append-only, line-oriented durable log
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    /// Opens `path` for appending, creating missing parent directories
    ///
    /// # Errors
    /// Returns `AuditError::CreateDir` or `AuditError::Open`; both are
    /// startup errors for the caller.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| AuditError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| AuditError::Open {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), "Opened action log");

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Location of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn name(&self) -> &'static str {
        "file"
    }

    fn write(&self, record: &LogRecord) -> Result<(), AuditError> {
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(file, "{}", record.to_line())?;
        file.flush()?;
        Ok(())
    }
}

// ============================================================================
// ConsoleSink
// ============================================================================

/// Layout of live notices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoticeFormat {
    /// Plain message lines
    #[default]
    Human,
    /// One JSON object per line
    Json,
}

impl FromStr for NoticeFormat {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "human" => Ok(NoticeFormat::Human),
            "json" => Ok(NoticeFormat::Json),
            other => Err(AuditError::UnknownFormat(other.to_string())),
        }
    }
}

/// Live notices for the operator on stdout
///
/// Human-format error notices go to stderr so stdout carries only actions.
#[derive(Debug, Clone, Default)]
pub struct ConsoleSink {
    format: NoticeFormat,
}

impl ConsoleSink {
    pub fn new(format: NoticeFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> NoticeFormat {
        self.format
    }

    /// Renders the notice text for a record
    pub fn render(&self, record: &LogRecord) -> Result<String, AuditError> {
        match self.format {
            NoticeFormat::Human => Ok(match record.severity() {
                Severity::Action => record.message().to_string(),
                Severity::Error => format!("Error: {}", record.message()),
            }),
            NoticeFormat::Json => {
                let value = json!({
                    "timestamp": record.timestamp().to_rfc3339(),
                    "level": record.severity(),
                    "kind": record.kind(),
                    "message": record.message(),
                });
                Ok(serde_json::to_string(&value)?)
            }
        }
    }
}

impl LogSink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn write(&self, record: &LogRecord) -> Result<(), AuditError> {
        let line = self.render(record)?;
        if self.format == NoticeFormat::Human && record.is_error() {
            let mut err = std::io::stderr().lock();
            writeln!(err, "{line}")?;
        } else {
            let mut out = std::io::stdout().lock();
            writeln!(out, "{line}")?;
            out.flush()?;
        }
        Ok(())
    }
}

// ============================================================================
// MemorySink
// ============================================================================

/// In-memory sink; clones share the same record buffer
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record written so far
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Messages of action records, in order
    pub fn action_messages(&self) -> Vec<String> {
        self.records()
            .iter()
            .filter(|r| !r.is_error())
            .map(|r| r.message().to_string())
            .collect()
    }

    /// Messages of error records, in order
    pub fn error_messages(&self) -> Vec<String> {
        self.records()
            .iter()
            .filter(|r| r.is_error())
            .map(|r| r.message().to_string())
            .collect()
    }

    /// Drops all buffered records
    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl LogSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn write(&self, record: &LogRecord) -> Result<(), AuditError> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
        Ok(())
    }
}
