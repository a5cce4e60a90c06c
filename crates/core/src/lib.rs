//! `batchrun-core`: execution records and their persisted form.
//!
//! This crate holds the state every other crate operates on: the execution tree and
//! its lifecycle, per-execution summaries and logs, the error taxonomy, and the
//! canonical serializer. It performs no IO.

pub mod error;
pub mod execution;
pub mod id;
pub mod log;
pub mod parameter;
pub mod serializer;
pub mod summary;

pub use error::{BatchError, BatchResult, BoxError, ErrorKind, ErrorRecord};
pub use execution::{
    ExecutionStatus, ExecutionTree, FinishOutcome, JobExecution, MAX_TREE_DEPTH, NodeId, Parameters,
};
pub use id::ExecutionId;
pub use log::{ExecutionLog, ExecutionLogger, LogEntry, LogLevel};
pub use parameter::{Parameter, ParameterAccessor, TypedParameter};
pub use serializer::{ExecutionDocument, ExecutionSerializer};
pub use summary::Summary;
