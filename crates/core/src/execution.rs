//! Job execution records and the lifecycle state machine.

use core::ops::{Index, IndexMut};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::{BatchError, BatchResult, ErrorRecord};
use crate::id::ExecutionId;
use crate::log::{ExecutionLog, ExecutionLogger, LogEntry, LogLevel};
use crate::summary::Summary;

/// Job parameters: insertion-ordered JSON object.
pub type Parameters = Map<String, JsonValue>;

/// Execution status.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// Created, not started yet
    Pending,
    /// Job logic is executing
    Running,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
    /// Stopped before completion (or never started)
    Stopped,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Stopped
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Stopped => "stopped",
        }
    }
}

impl core::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a running execution ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FinishOutcome {
    Success,
    Failure,
    Stopped,
}

impl FinishOutcome {
    pub fn status(self) -> ExecutionStatus {
        match self {
            FinishOutcome::Success => ExecutionStatus::Completed,
            FinishOutcome::Failure => ExecutionStatus::Failed,
            FinishOutcome::Stopped => ExecutionStatus::Stopped,
        }
    }
}

/// Position of an execution inside its [`ExecutionTree`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One run (or sub-run) of a job.
///
/// Status only moves forward: `pending -> running -> {completed|failed|stopped}`,
/// or `pending -> stopped` for a job that is abandoned before it starts. The
/// summary and the log accept writes only while the execution is running.
#[derive(Debug, Clone, PartialEq)]
pub struct JobExecution {
    pub(crate) id: ExecutionId,
    pub(crate) job_name: String,
    pub(crate) status: ExecutionStatus,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) ended_at: Option<DateTime<Utc>>,
    pub(crate) parameters: Parameters,
    pub(crate) summary: Summary,
    pub(crate) log: ExecutionLog,
    pub(crate) errors: Vec<ErrorRecord>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl JobExecution {
    fn pending(
        id: ExecutionId,
        job_name: impl Into<String>,
        parameters: Parameters,
        parent: Option<NodeId>,
    ) -> Self {
        Self {
            id,
            job_name: job_name.into(),
            status: ExecutionStatus::Pending,
            started_at: None,
            ended_at: None,
            parameters,
            summary: Summary::new(),
            log: ExecutionLog::new(),
            errors: Vec::new(),
            parent,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> &ExecutionId {
        &self.id
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Wall time between start and end, once both are known.
    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.ended_at? - self.started_at?)
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&JsonValue> {
        self.parameters.get(name)
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn log(&self) -> &ExecutionLog {
        &self.log
    }

    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_running(&self) -> bool {
        self.status == ExecutionStatus::Running
    }

    /// Enter `running`. Only valid from `pending`.
    pub fn start(&mut self) -> BatchResult<()> {
        if self.status != ExecutionStatus::Pending {
            return Err(BatchError::invalid_state(format!(
                "cannot start execution {} in status {}",
                self.id, self.status
            )));
        }
        self.status = ExecutionStatus::Running;
        self.started_at = Some(Utc::now());
        self.log.open();
        tracing::debug!(execution_id = %self.id, job = %self.job_name, "execution started");
        Ok(())
    }

    /// Leave `running` for the terminal status matching `outcome`.
    pub fn finish(&mut self, outcome: FinishOutcome) -> BatchResult<()> {
        if self.status != ExecutionStatus::Running {
            return Err(BatchError::invalid_state(format!(
                "cannot finish execution {} in status {}",
                self.id, self.status
            )));
        }
        self.log.seal();
        self.status = outcome.status();
        self.ended_at = Some(Utc::now());
        tracing::debug!(
            execution_id = %self.id,
            job = %self.job_name,
            status = %self.status,
            "execution finished"
        );
        Ok(())
    }

    /// Stop an execution that never started.
    pub fn abandon(&mut self) -> BatchResult<()> {
        if self.status != ExecutionStatus::Pending {
            return Err(BatchError::invalid_state(format!(
                "cannot abandon execution {} in status {}",
                self.id, self.status
            )));
        }
        self.status = ExecutionStatus::Stopped;
        self.ended_at = Some(Utc::now());
        Ok(())
    }

    /// Mutable summary access; only while running.
    pub fn summary_mut(&mut self) -> BatchResult<&mut Summary> {
        if self.status != ExecutionStatus::Running {
            return Err(BatchError::invalid_state(format!(
                "summary of execution {} is read-only in status {}",
                self.id, self.status
            )));
        }
        Ok(&mut self.summary)
    }

    /// Logger bound to this execution's log.
    pub fn logger(&self) -> ExecutionLogger {
        self.log.logger(self.id.clone())
    }

    /// Record `error` and log `message` at error level.
    ///
    /// The status is left alone; the caller decides whether the error is fatal.
    pub fn log_error(&mut self, error: &BatchError, message: impl Into<String>) -> BatchResult<()> {
        if self.status != ExecutionStatus::Running {
            return Err(BatchError::invalid_state(format!(
                "cannot record errors on execution {} in status {}",
                self.id, self.status
            )));
        }
        let record = ErrorRecord::from_error(error);

        let mut context = Map::new();
        context.insert("kind".to_string(), JsonValue::from(record.kind.as_str()));
        context.insert("error".to_string(), JsonValue::from(record.message.clone()));
        let entry = LogEntry::new(LogLevel::Error, message).with_context(context);

        tracing::error!(
            execution_id = %self.id,
            kind = %record.kind,
            error = %record.message,
            "{}",
            entry.message
        );
        self.log.push(entry);
        self.errors.push(record);
        Ok(())
    }
}

/// Deepest allowed child depth (the root is depth 0).
///
/// Keeps the serialized document within the JSON nesting limit of the
/// deserializer, with room left for nested parameter and summary values.
pub const MAX_TREE_DEPTH: usize = 32;

/// All executions of one run tree, rooted at index 0.
///
/// Records are never removed, and a node's parent always precedes it, so parent
/// links cannot form a cycle.
#[derive(Debug, Clone)]
pub struct ExecutionTree {
    nodes: Vec<JobExecution>,
}

impl ExecutionTree {
    /// New tree whose root has a generated id.
    pub fn new(job_name: impl Into<String>, parameters: Parameters) -> Self {
        Self::with_root_id(ExecutionId::generate(), job_name, parameters)
    }

    /// New tree whose root uses an externally supplied id.
    pub fn with_root_id(id: ExecutionId, job_name: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            nodes: vec![JobExecution::pending(id, job_name, parameters, None)],
        }
    }

    pub(crate) fn from_root_record(root: JobExecution) -> Self {
        Self { nodes: vec![root] }
    }

    /// Attach an already-built record below `parent`, bypassing lifecycle checks.
    pub(crate) fn attach_restored(&mut self, parent: NodeId, mut record: JobExecution) -> NodeId {
        let node = NodeId(self.nodes.len());
        record.parent = Some(parent);
        record.children.clear();
        self.nodes.push(record);
        self.nodes[parent.0].children.push(node);
        node
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn root_execution(&self) -> &JobExecution {
        &self.nodes[0]
    }

    pub fn root_execution_mut(&mut self) -> &mut JobExecution {
        &mut self.nodes[0]
    }

    pub fn id(&self) -> &ExecutionId {
        &self.nodes[0].id
    }

    pub fn get(&self, node: NodeId) -> Option<&JobExecution> {
        self.nodes.get(node.0)
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut JobExecution> {
        self.nodes.get_mut(node.0)
    }

    fn require(&self, node: NodeId) -> BatchResult<&JobExecution> {
        self.get(node)
            .ok_or_else(|| BatchError::not_found(format!("no execution at node {}", node.0)))
    }

    pub fn find(&self, id: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|e| e.id.as_str() == id)
            .map(NodeId)
    }

    /// Spawn a sub-execution of a running `parent`, with a generated id.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        job_name: impl Into<String>,
        parameters: Parameters,
    ) -> BatchResult<NodeId> {
        let mut id = ExecutionId::generate();
        while self.find(id.as_str()).is_some() {
            id = ExecutionId::generate();
        }
        self.add_child_with_id(parent, id, job_name, parameters)
    }

    /// Spawn a sub-execution of a running `parent` with a caller-chosen id.
    ///
    /// Fails with `InvalidState` when `parent` is not running, when `id` is
    /// already taken, or when the child would sit deeper than [`MAX_TREE_DEPTH`].
    pub fn add_child_with_id(
        &mut self,
        parent: NodeId,
        id: ExecutionId,
        job_name: impl Into<String>,
        parameters: Parameters,
    ) -> BatchResult<NodeId> {
        let parent_exec = self.require(parent)?;
        if !parent_exec.is_running() {
            return Err(BatchError::invalid_state(format!(
                "execution {} cannot spawn children in status {}",
                parent_exec.id, parent_exec.status
            )));
        }
        if self.depth(parent) >= MAX_TREE_DEPTH {
            return Err(BatchError::invalid_state(format!(
                "execution {} is at the maximum tree depth {MAX_TREE_DEPTH}",
                parent_exec.id
            )));
        }
        if self.find(id.as_str()).is_some() {
            return Err(BatchError::invalid_state(format!(
                "execution id {id} already exists in this tree"
            )));
        }

        let node = NodeId(self.nodes.len());
        self.nodes
            .push(JobExecution::pending(id, job_name, parameters, Some(parent)));
        self.nodes[parent.0].children.push(node);
        Ok(node)
    }

    pub fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.get(node).and_then(|e| e.parent)
    }

    pub fn children_of(&self, node: NodeId) -> &[NodeId] {
        self.get(node).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    /// Walk parent links up to the ancestor without a parent.
    pub fn root_of(&self, node: NodeId) -> NodeId {
        let mut current = node;
        while let Some(parent) = self.parent_of(current) {
            current = parent;
        }
        current
    }

    /// Number of parent links between `node` and the root.
    pub fn depth(&self, node: NodeId) -> usize {
        let mut depth = 0;
        let mut current = node;
        while let Some(parent) = self.parent_of(current) {
            depth += 1;
            current = parent;
        }
        depth
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &JobExecution)> {
        self.nodes.iter().enumerate().map(|(i, e)| (NodeId(i), e))
    }

    /// Nodes of the subtree under `start`, parents before children, siblings in order.
    pub fn depth_first(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if self.get(node).is_none() {
                continue;
            }
            out.push(node);
            stack.extend(self.children_of(node).iter().rev().copied());
        }
        out
    }

    fn same_subtree(&self, node: NodeId, other: &ExecutionTree, other_node: NodeId) -> bool {
        let (Some(a), Some(b)) = (self.get(node), other.get(other_node)) else {
            return false;
        };
        a.id == b.id
            && a.job_name == b.job_name
            && a.status == b.status
            && a.started_at == b.started_at
            && a.ended_at == b.ended_at
            && a.parameters == b.parameters
            && a.summary == b.summary
            && a.log == b.log
            && a.errors == b.errors
            && a.children.len() == b.children.len()
            && a
                .children
                .iter()
                .zip(&b.children)
                .all(|(x, y)| self.same_subtree(*x, other, *y))
    }
}

/// Structural equality: same records in the same tree shape, regardless of the
/// order in which nodes were created.
impl PartialEq for ExecutionTree {
    fn eq(&self, other: &Self) -> bool {
        self.same_subtree(self.root(), other, other.root())
    }
}

impl Index<NodeId> for ExecutionTree {
    type Output = JobExecution;

    fn index(&self, node: NodeId) -> &Self::Output {
        &self.nodes[node.0]
    }
}

impl IndexMut<NodeId> for ExecutionTree {
    fn index_mut(&mut self, node: NodeId) -> &mut Self::Output {
        &mut self.nodes[node.0]
    }
}
