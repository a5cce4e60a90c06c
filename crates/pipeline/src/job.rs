//! Job abstraction and the lifecycle driver shared by root and child runs.

use batchrun_core::{
    BatchError, BatchResult, ExecutionLogger, ExecutionStatus, ExecutionTree, FinishOutcome,
    JobExecution, NodeId, ParameterAccessor, Parameters, Summary,
};
use tracing::{info, info_span, warn};

/// How job logic ended when it did not fail.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    /// The job decided to stop early; the execution ends `stopped`.
    Stopped,
}

/// A unit of job logic executed against one execution.
///
/// Errors returned from `run` are captured into the execution by [`run_job`]; they
/// never cross the job boundary.
pub trait Job {
    fn run(&mut self, scope: &mut ExecutionScope<'_>) -> BatchResult<JobOutcome>;
}

impl<J: Job + ?Sized> Job for Box<J> {
    fn run(&mut self, scope: &mut ExecutionScope<'_>) -> BatchResult<JobOutcome> {
        (**self).run(scope)
    }
}

/// What a running job may touch: its own execution's summary and log, read access
/// to the tree, and sub-job spawning.
///
/// Lifecycle transitions stay with [`run_job`].
#[derive(Debug)]
pub struct ExecutionScope<'a> {
    tree: &'a mut ExecutionTree,
    node: NodeId,
}

impl<'a> ExecutionScope<'a> {
    pub fn new(tree: &'a mut ExecutionTree, node: NodeId) -> Self {
        Self { tree, node }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn tree(&self) -> &ExecutionTree {
        self.tree
    }

    pub fn execution(&self) -> &JobExecution {
        &self.tree[self.node]
    }

    /// The top-level ancestor of this execution (itself for a root run).
    pub fn root_execution(&self) -> &JobExecution {
        &self.tree[self.tree.root_of(self.node)]
    }

    pub fn summary_mut(&mut self) -> BatchResult<&mut Summary> {
        self.tree[self.node].summary_mut()
    }

    pub fn logger(&self) -> ExecutionLogger {
        self.execution().logger()
    }

    pub fn parameter<A: ParameterAccessor>(&self, accessor: &A) -> BatchResult<A::Value> {
        accessor.get(self.tree, self.node)
    }

    /// Spawn a child execution and run `job` in it to completion.
    ///
    /// A failing child ends `failed` but does not fail this execution; inspect the
    /// returned node's status to decide.
    pub fn run_child(
        &mut self,
        job: &mut dyn Job,
        job_name: &str,
        parameters: Parameters,
    ) -> BatchResult<NodeId> {
        let child = self.tree.add_child(self.node, job_name, parameters)?;
        run_job(job, self.tree, child)?;
        Ok(child)
    }
}

/// Drive `node` through `pending -> running -> terminal` around `job`.
///
/// Errors raised by the job are recorded with `log_error` and turn into status
/// `failed`. The only errors returned are lifecycle misuse, e.g. running a node
/// that is not pending; those never touch the execution record.
pub fn run_job(job: &mut dyn Job, tree: &mut ExecutionTree, node: NodeId) -> BatchResult<ExecutionStatus> {
    let exec = tree
        .get_mut(node)
        .ok_or_else(|| BatchError::not_found(format!("no execution at node {}", node.index())))?;
    exec.start()?;

    let execution_id = exec.id().clone();
    let job_name = exec.job_name().to_string();
    let span = info_span!("job_execution", execution_id = %execution_id, job = %job_name);
    let _entered = span.enter();
    info!("job started");

    let result = {
        let mut scope = ExecutionScope::new(tree, node);
        job.run(&mut scope)
    };

    let exec = &mut tree[node];
    let outcome = match result {
        Ok(JobOutcome::Completed) => FinishOutcome::Success,
        Ok(JobOutcome::Stopped) => {
            warn!("job stopped before completion");
            FinishOutcome::Stopped
        }
        Err(err) => {
            exec.log_error(&err, format!("job `{job_name}` failed: {err}"))?;
            FinishOutcome::Failure
        }
    };
    exec.finish(outcome)?;

    info!(status = %exec.status(), "job finished");
    Ok(exec.status())
}
