//! Scheduling policy interface and the jobs it yields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use batchrun_core::{ExecutionId, Parameters};

/// Clock a scheduler evaluates against.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ScheduleContext {
    pub now: DateTime<Utc>,
}

impl ScheduleContext {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Default for ScheduleContext {
    fn default() -> Self {
        Self::at(Utc::now())
    }
}

/// A job a scheduler considers due.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub job_name: String,
    #[serde(default)]
    pub parameters: Parameters,
    /// Used verbatim as the launched execution's id when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ExecutionId>,
}

impl ScheduledJob {
    pub fn new(job_name: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            parameters: Parameters::new(),
            id: None,
        }
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_id(mut self, id: impl Into<ExecutionId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Scheduling policy.
///
/// Implementations must be free of side effects: asking twice with the same
/// context yields the same jobs in the same order.
pub trait Scheduler: Send + Sync {
    fn get(&self, ctx: &ScheduleContext) -> Box<dyn Iterator<Item = ScheduledJob> + '_>;
}

impl<S: Scheduler + ?Sized> Scheduler for Box<S> {
    fn get(&self, ctx: &ScheduleContext) -> Box<dyn Iterator<Item = ScheduledJob> + '_> {
        (**self).get(ctx)
    }
}

impl<S: Scheduler + ?Sized> Scheduler for std::sync::Arc<S> {
    fn get(&self, ctx: &ScheduleContext) -> Box<dyn Iterator<Item = ScheduledJob> + '_> {
        (**self).get(ctx)
    }
}
