//! Job name to job factory mapping.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use batchrun_core::{BatchError, BatchResult, Parameters};
use batchrun_pipeline::Job;

/// Builds a fresh job instance for one launch.
///
/// Receives the launch parameters so factories can size buffers or pick
/// collaborators; invalid parameters should be reported as configuration errors.
pub type JobFactory = Box<dyn Fn(&Parameters) -> BatchResult<Box<dyn Job>> + Send + Sync>;

#[derive(Default)]
pub struct JobRegistry {
    factories: RwLock<BTreeMap<String, JobFactory>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the factory for `job_name`.
    pub fn register<F>(&self, job_name: impl Into<String>, factory: F)
    where
        F: Fn(&Parameters) -> BatchResult<Box<dyn Job>> + Send + Sync + 'static,
    {
        self.factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job_name.into(), Box::new(factory));
    }

    pub fn contains(&self, job_name: &str) -> bool {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(job_name)
    }

    /// Registered job names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Instantiate the job registered as `job_name`.
    ///
    /// The registry lock is released before the job runs, so a running job may
    /// itself launch registered jobs.
    pub fn create(&self, job_name: &str, parameters: &Parameters) -> BatchResult<Box<dyn Job>> {
        let factories = self.factories.read().unwrap_or_else(PoisonError::into_inner);
        let factory = factories
            .get(job_name)
            .ok_or_else(|| BatchError::configuration(format!("unknown job `{job_name}`")))?;
        factory(parameters)
    }
}

impl core::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JobRegistry").field("jobs", &self.names()).finish()
    }
}
