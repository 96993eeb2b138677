//! Host application log capture

use crate::event::EventId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Totally ordered log severity, lowest (`Verbose`) to highest (`Error`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Most verbose diagnostic output.
    Verbose,
    /// Developer-facing debug output.
    Debug,
    /// Informational message.
    Info,
    /// Recoverable problem.
    Warning,
    /// Unrecoverable or user-visible failure.
    Error,
}

/// A single captured host log record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    /// Event id.
    pub id: EventId,
    /// Emission timestamp.
    pub timestamp: DateTime<Utc>,
    /// Severity.
    pub level: LogLevel,
    /// Where the record originated (e.g. "app", "framework").
    pub source: String,
    /// Logical subsystem, e.g. "networking".
    pub subsystem: String,
    /// Free-form category label.
    pub category: String,
    /// Thread name or id that produced the record.
    pub thread: String,
    /// Source file, if known.
    pub file: Option<String>,
    /// Source function, if known.
    pub function: Option<String>,
    /// Source line, if known.
    pub line: Option<u32>,
    /// The log message itself.
    pub message: String,
    /// Free-form tags for filtering.
    pub tags: Vec<String>,
    /// Distributed trace id, if the log record is correlated to one.
    pub trace_id: Option<String>,
}
