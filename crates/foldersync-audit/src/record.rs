//! Log records
//!
//! A [`LogRecord`] is one line of the action log: a second-resolution local
//! timestamp, a severity, and the human-readable message. Error lines carry
//! an `ERROR` marker so they can be told apart from successful actions.

use std::fmt;

use chrono::{DateTime, Local};
use foldersync_core::domain::{ActionKind, SyncAction};
use serde::{Deserialize, Serialize};

/// Timestamp layout used in the durable log, second resolution
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Whether a record reports a completed action or a caught error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// An action was applied to the replica
    Action,
    /// A per-entry or sink error was caught and the pass continued
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Action => "action",
            Severity::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// One entry of the action log
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    timestamp: DateTime<Local>,
    severity: Severity,
    kind: Option<ActionKind>,
    message: String,
}

impl LogRecord {
    /// Creates a record for an executed action, stamped now
    pub fn for_action(action: &SyncAction) -> Self {
        Self {
            timestamp: Local::now(),
            severity: Severity::Action,
            kind: Some(action.kind()),
            message: action.message(),
        }
    }

    /// Creates an error record, stamped now
    pub fn for_error(message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            severity: Severity::Error,
            kind: None,
            message: message.into(),
        }
    }

    /// Overrides the timestamp
    pub fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn timestamp(&self) -> &DateTime<Local> {
        &self.timestamp
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// The action category, `None` for error records
    pub fn kind(&self) -> Option<ActionKind> {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Renders the durable log line (without trailing newline)
    ///
    /// `2024-05-01 12:00:00 - File created: /src/a to /dst/a` for actions,
    /// `2024-05-01 12:00:00 - ERROR - <message>` for errors.
    pub fn to_line(&self) -> String {
        let stamp = self.timestamp.format(TIMESTAMP_FORMAT);
        match self.severity {
            Severity::Action => format!("{stamp} - {}", self.message),
            Severity::Error => format!("{stamp} - ERROR - {}", self.message),
        }
    }
}
