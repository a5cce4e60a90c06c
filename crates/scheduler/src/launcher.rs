//! Seam between the trigger job and whatever actually runs jobs.

use std::sync::Arc;

use batchrun_core::{BatchResult, ExecutionId, ExecutionTree, Parameters};

/// Starts a job by name and runs it to completion.
///
/// Unknown job names are configuration errors returned to the caller; failures
/// inside the launched job are recorded in the returned tree instead.
pub trait Launcher: Send + Sync {
    fn launch(
        &self,
        job_name: &str,
        parameters: Parameters,
        id: Option<ExecutionId>,
    ) -> BatchResult<ExecutionTree>;
}

impl<L: Launcher + ?Sized> Launcher for Arc<L> {
    fn launch(
        &self,
        job_name: &str,
        parameters: Parameters,
        id: Option<ExecutionId>,
    ) -> BatchResult<ExecutionTree> {
        (**self).launch(job_name, parameters, id)
    }
}

impl<L: Launcher + ?Sized> Launcher for &L {
    fn launch(
        &self,
        job_name: &str,
        parameters: Parameters,
        id: Option<ExecutionId>,
    ) -> BatchResult<ExecutionTree> {
        (**self).launch(job_name, parameters, id)
    }
}
