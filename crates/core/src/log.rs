//! Execution-scoped log capture.
//!
//! Each [`ExecutionLog`] owns its buffer. Code that wants to write into it gets an
//! [`ExecutionLogger`]: a cheap, cloneable handle holding a *weak* reference to
//! exactly one execution's buffer. There is no process-wide "current execution"
//! slot, so two executions running on different threads never see each other's
//! entries.
//!
//! The buffer only accepts entries while it is open. The owning
//! [`JobExecution`](crate::JobExecution) opens it when it enters `running` and seals
//! it when it leaves, which gives the routing rules:
//!
//! - calls on a detached logger, or before the execution starts, are discarded;
//! - calls while the execution runs are appended in call order;
//! - calls after the execution left `running` are discarded.
//!
//! Every call is mirrored to `tracing` regardless, tagged with `execution_id`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::id::ExecutionId;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// One captured log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, JsonValue>,
    pub time: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            context: Map::new(),
            time: Utc::now(),
        }
    }

    pub fn with_context(mut self, context: Map<String, JsonValue>) -> Self {
        self.context = context;
        self
    }
}

#[derive(Debug, Default)]
struct LogBuffer {
    open: bool,
    entries: Vec<LogEntry>,
}

fn lock(buffer: &Mutex<LogBuffer>) -> MutexGuard<'_, LogBuffer> {
    // A panic while holding the lock cannot leave `entries` half-written.
    buffer.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Append-only, ordered log buffer owned by one execution.
#[derive(Debug, Default)]
pub struct ExecutionLog {
    buffer: Arc<Mutex<LogBuffer>>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a sealed log from previously captured entries.
    pub fn from_entries(entries: Vec<LogEntry>) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(LogBuffer {
                open: false,
                entries,
            })),
        }
    }

    pub(crate) fn open(&self) {
        lock(&self.buffer).open = true;
    }

    pub(crate) fn seal(&self) {
        lock(&self.buffer).open = false;
    }

    pub fn is_open(&self) -> bool {
        lock(&self.buffer).open
    }

    /// Append `entry` if the log is open. Returns whether it was retained.
    pub fn push(&self, entry: LogEntry) -> bool {
        let mut buf = lock(&self.buffer);
        if buf.open {
            buf.entries.push(entry);
            true
        } else {
            false
        }
    }

    /// Snapshot of the captured entries, in call order.
    pub fn entries(&self) -> Vec<LogEntry> {
        lock(&self.buffer).entries.clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.buffer).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A logger handle bound to this buffer.
    pub fn logger(&self, execution_id: ExecutionId) -> ExecutionLogger {
        ExecutionLogger {
            execution_id: Some(execution_id),
            buffer: Arc::downgrade(&self.buffer),
        }
    }
}

/// Deep copy: the clone gets its own buffer, loggers of the original never reach it.
impl Clone for ExecutionLog {
    fn clone(&self) -> Self {
        let buf = lock(&self.buffer);
        Self {
            buffer: Arc::new(Mutex::new(LogBuffer {
                open: buf.open,
                entries: buf.entries.clone(),
            })),
        }
    }
}

impl PartialEq for ExecutionLog {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.buffer, &other.buffer) || self.entries() == other.entries()
    }
}

/// Handle used by jobs and collaborators to log into one execution.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLogger {
    execution_id: Option<ExecutionId>,
    buffer: Weak<Mutex<LogBuffer>>,
}

impl ExecutionLogger {
    /// A logger bound to nothing: entries only reach `tracing`.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn execution_id(&self) -> Option<&ExecutionId> {
        self.execution_id.as_ref()
    }

    /// Whether calls made right now would be retained.
    pub fn is_bound(&self) -> bool {
        self.buffer
            .upgrade()
            .map(|buffer| lock(&buffer).open)
            .unwrap_or(false)
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>, context: Map<String, JsonValue>) {
        let entry = LogEntry::new(level, message).with_context(context);
        self.mirror(&entry);
        if let Some(buffer) = self.buffer.upgrade() {
            let mut buf = lock(&buffer);
            if buf.open {
                buf.entries.push(entry);
            }
        }
    }

    pub fn trace(&self, message: impl Into<String>) {
        self.log(LogLevel::Trace, message, Map::new());
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message, Map::new());
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message, Map::new());
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message, Map::new());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message, Map::new());
    }

    fn mirror(&self, entry: &LogEntry) {
        let execution_id = self.execution_id.as_ref().map(ExecutionId::as_str).unwrap_or("-");
        let message = entry.message.as_str();
        let context = JsonValue::Object(entry.context.clone());
        match entry.level {
            LogLevel::Trace => tracing::trace!(execution_id, %context, "{message}"),
            LogLevel::Debug => tracing::debug!(execution_id, %context, "{message}"),
            LogLevel::Info => tracing::info!(execution_id, %context, "{message}"),
            LogLevel::Warn => tracing::warn!(execution_id, %context, "{message}"),
            LogLevel::Error => tracing::error!(execution_id, %context, "{message}"),
        }
    }
}
