//! ActionLog - dual-sink action reporting
//!
//! Every action the engine applies, and every error it catches, is reported
//! through one call that fans out to all configured sinks. Sink failures are
//! logged via `tracing::warn!` but never propagated, so reporting can never
//! break a sync pass.

use std::path::Path;

use foldersync_core::domain::SyncAction;
use tracing::warn;

use crate::record::LogRecord;
use crate::sink::{ConsoleSink, FileSink, LogSink, NoticeFormat};
use crate::AuditError;

/// Fan-out reporter owned by the sync engine
///
/// Constructed explicitly and passed in; there is no process-wide logger.
#[derive(Default)]
pub struct ActionLog {
    sinks: Vec<Box<dyn LogSink>>,
}

impl ActionLog {
    /// Creates an `ActionLog` with no sinks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Durable file log at `log_path` plus live console notices
    ///
    /// # Errors
    /// Fails if the log directory cannot be created or the file cannot be
    /// opened; callers treat this as a startup error.
    pub fn standard(log_path: &Path, format: NoticeFormat) -> Result<Self, AuditError> {
        let file = FileSink::open(log_path)?;
        Ok(Self::new()
            .with_sink(file)
            .with_sink(ConsoleSink::new(format)))
    }

    /// Adds a sink, builder style.
    pub fn with_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Number of attached sinks.
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Report an applied action to every sink.
    pub fn record_action(&self, action: &SyncAction) {
        self.dispatch(&LogRecord::for_action(action));
    }

    /// Report a caught error to every sink.
    pub fn record_error(&self, message: impl Into<String>) {
        self.dispatch(&LogRecord::for_error(message));
    }

    fn dispatch(&self, record: &LogRecord) {
        for sink in &self.sinks {
            if let Err(e) = sink.write(record) {
                warn!(sink = sink.name(), error = %e, "Failed to write log record");
            }
        }
    }
}

impl std::fmt::Debug for ActionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.sinks.iter().map(|s| s.name()).collect();
        f.debug_struct("ActionLog").field("sinks", &names).finish()
    }
}
