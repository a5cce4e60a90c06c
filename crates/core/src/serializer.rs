//! Canonical persisted form of an execution tree.
//!
//! The document is a nested JSON object, one per execution:
//!
//! ```text
//! {
//!   "id": "...", "job_name": "...", "status": "completed",
//!   "started_at": "2024-01-01T00:00:00Z", "ended_at": "...",   // omitted when unset
//!   "parameters": {...}, "summary": {...},
//!   "logs":   [{"level", "message", "context"?, "time"}],
//!   "errors": [{"kind", "message", "trace"?}],
//!   "children": [ <document>, ... ]
//! }
//! ```
//!
//! Optional fields are omitted rather than written as `null`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{BatchError, BatchResult, ErrorRecord};
use crate::execution::{ExecutionStatus, ExecutionTree, JobExecution, MAX_TREE_DEPTH, NodeId, Parameters};
use crate::id::ExecutionId;
use crate::log::{ExecutionLog, LogEntry};
use crate::summary::Summary;

/// Serialized shape of one execution and, recursively, its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionDocument {
    pub id: ExecutionId,
    pub job_name: String,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub summary: Summary,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub errors: Vec<ErrorRecord>,
    #[serde(default)]
    pub children: Vec<ExecutionDocument>,
}

/// Converts execution trees to and from their canonical document form.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExecutionSerializer;

impl ExecutionSerializer {
    pub fn new() -> Self {
        Self
    }

    pub fn to_document(&self, tree: &ExecutionTree) -> ExecutionDocument {
        document_for(tree, tree.root())
    }

    /// Rebuild a tree. Duplicate ids and nesting deeper than [`MAX_TREE_DEPTH`]
    /// are rejected as `TypeMismatch`.
    pub fn from_document(&self, mut document: ExecutionDocument) -> BatchResult<ExecutionTree> {
        check_document(&document, 0, &mut HashSet::new())?;

        let children = std::mem::take(&mut document.children);
        let mut tree = ExecutionTree::from_root_record(record_from(document));
        let root = tree.root();
        for child in children {
            restore_subtree(&mut tree, root, child);
        }
        Ok(tree)
    }

    pub fn to_value(&self, tree: &ExecutionTree) -> BatchResult<JsonValue> {
        Ok(serde_json::to_value(self.to_document(tree))?)
    }

    pub fn from_value(&self, value: JsonValue) -> BatchResult<ExecutionTree> {
        let document: ExecutionDocument = serde_json::from_value(value)?;
        self.from_document(document)
    }

    /// Compact JSON text.
    pub fn serialize(&self, tree: &ExecutionTree) -> BatchResult<String> {
        Ok(serde_json::to_string(&self.to_document(tree))?)
    }

    pub fn serialize_pretty(&self, tree: &ExecutionTree) -> BatchResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_document(tree))?)
    }

    pub fn deserialize(&self, text: &str) -> BatchResult<ExecutionTree> {
        let document: ExecutionDocument = serde_json::from_str(text)?;
        self.from_document(document)
    }
}

fn document_for(tree: &ExecutionTree, node: NodeId) -> ExecutionDocument {
    let exec = &tree[node];
    ExecutionDocument {
        id: exec.id.clone(),
        job_name: exec.job_name.clone(),
        status: exec.status,
        started_at: exec.started_at,
        ended_at: exec.ended_at,
        parameters: exec.parameters.clone(),
        summary: exec.summary.clone(),
        logs: exec.log.entries(),
        errors: exec.errors.clone(),
        children: exec
            .children
            .iter()
            .map(|child| document_for(tree, *child))
            .collect(),
    }
}

fn check_document<'a>(
    document: &'a ExecutionDocument,
    depth: usize,
    seen: &mut HashSet<&'a str>,
) -> BatchResult<()> {
    if depth > MAX_TREE_DEPTH {
        return Err(BatchError::type_mismatch(format!(
            "execution `{}` is nested deeper than {MAX_TREE_DEPTH}",
            document.id
        )));
    }
    if !seen.insert(document.id.as_str()) {
        return Err(BatchError::type_mismatch(format!(
            "duplicate execution id `{}` in document",
            document.id
        )));
    }
    document
        .children
        .iter()
        .try_for_each(|child| check_document(child, depth + 1, seen))
}

/// Build a record from the document's own fields; children are attached separately.
fn record_from(document: ExecutionDocument) -> JobExecution {
    let log = ExecutionLog::from_entries(document.logs);
    if document.status == ExecutionStatus::Running {
        log.open();
    }
    JobExecution {
        id: document.id,
        job_name: document.job_name,
        status: document.status,
        started_at: document.started_at,
        ended_at: document.ended_at,
        parameters: document.parameters,
        summary: document.summary,
        log,
        errors: document.errors,
        parent: None,
        children: Vec::new(),
    }
}

fn restore_subtree(tree: &mut ExecutionTree, parent: NodeId, mut document: ExecutionDocument) {
    let children = std::mem::take(&mut document.children);
    let node = tree.attach_restored(parent, record_from(document));
    for child in children {
        restore_subtree(tree, node, child);
    }
}
