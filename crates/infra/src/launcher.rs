//! Synchronous in-process launcher.

use std::sync::Arc;

use tracing::{info, warn};

use batchrun_core::{BatchResult, ExecutionId, ExecutionTree, Parameters};
use batchrun_pipeline::run_job;
use batchrun_scheduler::Launcher;

use crate::registry::JobRegistry;
use crate::store::ExecutionStore;

/// Runs registered jobs on the calling thread and stores every finished tree.
pub struct LocalLauncher {
    registry: Arc<JobRegistry>,
    store: Arc<dyn ExecutionStore>,
}

impl LocalLauncher {
    pub fn new(registry: Arc<JobRegistry>, store: Arc<dyn ExecutionStore>) -> Self {
        Self { registry, store }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn ExecutionStore> {
        &self.store
    }
}

impl core::fmt::Debug for LocalLauncher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LocalLauncher")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Launcher for LocalLauncher {
    fn launch(
        &self,
        job_name: &str,
        parameters: Parameters,
        id: Option<ExecutionId>,
    ) -> BatchResult<ExecutionTree> {
        // Resolved before any record exists: an unknown job never gets an execution.
        let mut job = self.registry.create(job_name, &parameters).inspect_err(|err| {
            warn!(job = %job_name, error = %err, "launch rejected");
        })?;

        let id = id.unwrap_or_else(ExecutionId::generate);
        let mut tree = ExecutionTree::with_root_id(id, job_name, parameters);
        let root = tree.root();
        let status = run_job(job.as_mut(), &mut tree, root)?;

        self.store.store(&tree)?;
        info!(execution_id = %tree.id(), job = %job_name, status = %status, "execution stored");
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchrun_core::{BatchError, ErrorKind, ExecutionStatus};
    use batchrun_pipeline::{ExecutionScope, Job, JobOutcome};
    use serde_json::json;

    use crate::store::InMemoryExecutionStore;

    struct Echo;

    impl Job for Echo {
        fn run(&mut self, scope: &mut ExecutionScope<'_>) -> BatchResult<JobOutcome> {
            let value = scope.execution().parameter("value").cloned().unwrap_or_default();
            scope.summary_mut()?.set("echo", value);
            Ok(JobOutcome::Completed)
        }
    }

    struct Failing;

    impl Job for Failing {
        fn run(&mut self, _scope: &mut ExecutionScope<'_>) -> BatchResult<JobOutcome> {
            Err(BatchError::io("disk full"))
        }
    }

    fn launcher() -> (LocalLauncher, Arc<InMemoryExecutionStore>) {
        let registry = Arc::new(JobRegistry::new());
        registry.register("echo", |_| Ok(Box::new(Echo) as Box<dyn Job>));
        registry.register("failing", |_| Ok(Box::new(Failing) as Box<dyn Job>));
        let store = InMemoryExecutionStore::arc();
        (LocalLauncher::new(registry, store.clone()), store)
    }

    #[test]
    fn launch_runs_and_stores() {
        let (launcher, store) = launcher();
        let mut params = Parameters::new();
        params.insert("value".into(), json!(42));

        let tree = launcher.launch("echo", params, Some("echo-1".into())).unwrap();

        assert_eq!(tree.id().as_str(), "echo-1");
        assert_eq!(tree.root_execution().status(), ExecutionStatus::Completed);
        assert_eq!(tree.root_execution().summary().get("echo"), Some(&json!(42)));
        assert_eq!(store.retrieve(&"echo-1".into()).unwrap(), tree);
    }

    #[test]
    fn generated_id_when_none_given() {
        let (launcher, store) = launcher();
        let tree = launcher.launch("echo", Parameters::new(), None).unwrap();
        assert!(store.contains(tree.id()));
    }

    #[test]
    fn job_failure_is_recorded_not_raised() {
        let (launcher, store) = launcher();
        let tree = launcher.launch("failing", Parameters::new(), Some("f-1".into())).unwrap();

        let stored = store.retrieve(&"f-1".into()).unwrap();
        assert_eq!(stored.root_execution().status(), ExecutionStatus::Failed);
        assert_eq!(stored.root_execution().errors()[0].kind, ErrorKind::Io);
        assert_eq!(stored, tree);
    }

    #[test]
    fn unknown_job_is_raised_and_nothing_stored() {
        let (launcher, store) = launcher();
        let err = launcher.launch("ghost", Parameters::new(), None).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(store.is_empty());
    }
}
