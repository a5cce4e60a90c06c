//! Engine error model.

use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Boxed source error carried by [`BatchError`] variants.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result type used across the engine.
pub type BatchResult<T> = Result<T, BatchError>;

/// Closed set of error categories.
///
/// This is the tag persisted in [`ErrorRecord::kind`], so renaming a variant is a
/// wire-format change.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Invalid wiring (unknown job name, wrong collaborator, bad config value).
    Configuration,
    /// Underlying storage/file/network failure.
    Io,
    /// A value at a boundary does not have the expected shape.
    TypeMismatch,
    /// A named parameter is missing or unreachable.
    ParameterAccess,
    /// Illegal lifecycle transition.
    InvalidState,
    /// A requested record does not exist.
    NotFound,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Io => "io",
            ErrorKind::TypeMismatch => "type_mismatch",
            ErrorKind::ParameterAccess => "parameter_access",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::NotFound => "not_found",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine-level error.
///
/// Every variant carries a human-readable message and, optionally, the error that
/// caused it. The source chain is what ends up in [`ErrorRecord::trace`].
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("io error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("type mismatch: {message}")]
    TypeMismatch {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("parameter access failed: {message}")]
    ParameterAccess {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("invalid state: {message}")]
    InvalidState {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("not found: {message}")]
    NotFound {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl BatchError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
            source: None,
        }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io {
            message: msg.into(),
            source: None,
        }
    }

    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        Self::TypeMismatch {
            message: msg.into(),
            source: None,
        }
    }

    pub fn parameter_access(msg: impl Into<String>) -> Self {
        Self::ParameterAccess {
            message: msg.into(),
            source: None,
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState {
            message: msg.into(),
            source: None,
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound {
            message: msg.into(),
            source: None,
        }
    }

    /// Attach the error that caused this one.
    pub fn with_source(mut self, cause: impl Into<BoxError>) -> Self {
        let slot = match &mut self {
            BatchError::Configuration { source, .. }
            | BatchError::Io { source, .. }
            | BatchError::TypeMismatch { source, .. }
            | BatchError::ParameterAccess { source, .. }
            | BatchError::InvalidState { source, .. }
            | BatchError::NotFound { source, .. } => source,
        };
        *slot = Some(cause.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BatchError::Configuration { .. } => ErrorKind::Configuration,
            BatchError::Io { .. } => ErrorKind::Io,
            BatchError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            BatchError::ParameterAccess { .. } => ErrorKind::ParameterAccess,
            BatchError::InvalidState { .. } => ErrorKind::InvalidState,
            BatchError::NotFound { .. } => ErrorKind::NotFound,
        }
    }

    /// The message without the kind prefix added by `Display`.
    pub fn message(&self) -> &str {
        match self {
            BatchError::Configuration { message, .. }
            | BatchError::Io { message, .. }
            | BatchError::TypeMismatch { message, .. }
            | BatchError::ParameterAccess { message, .. }
            | BatchError::InvalidState { message, .. }
            | BatchError::NotFound { message, .. } => message,
        }
    }

    /// Render the `source()` chain, one cause per line. `None` when there is no cause.
    pub fn trace(&self) -> Option<String> {
        let mut lines = Vec::new();
        let mut cause = self.source();
        while let Some(err) = cause {
            lines.push(format!("caused by: {err}"));
            cause = err.source();
        }
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

impl From<std::io::Error> for BatchError {
    fn from(err: std::io::Error) -> Self {
        BatchError::io(err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for BatchError {
    fn from(err: serde_json::Error) -> Self {
        let msg = err.to_string();
        if err.is_io() {
            BatchError::io(msg).with_source(err)
        } else {
            BatchError::type_mismatch(msg).with_source(err)
        }
    }
}

/// Structured error captured into a job execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl ErrorRecord {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            trace: None,
        }
    }

    pub fn from_error(err: &BatchError) -> Self {
        Self {
            kind: err.kind(),
            message: err.message().to_string(),
            trace: err.trace(),
        }
    }
}
