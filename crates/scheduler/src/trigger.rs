//! Job that asks schedulers what is due and launches it.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value as JsonValue, json};
use tracing::{info, warn};

use batchrun_core::{BatchResult, LogLevel};
use batchrun_pipeline::{ExecutionScope, Job, JobOutcome};

use crate::launcher::Launcher;
use crate::scheduler::{ScheduleContext, Scheduler};

/// Summary key holding one `{scheduler, job, id}` object per launch.
pub const JOBS_KEY: &str = "jobs";

/// Consults every configured scheduler in order and launches each due job
/// synchronously.
///
/// The first launch failure aborts the run; launches already made stay
/// recorded in the summary.
pub struct TriggerScheduledJobsJob<L> {
    schedulers: Vec<(String, Box<dyn Scheduler>)>,
    launcher: L,
    clock: Option<DateTime<Utc>>,
}

impl<L: Launcher> TriggerScheduledJobsJob<L> {
    pub fn new(launcher: L) -> Self {
        Self {
            schedulers: Vec::new(),
            launcher,
            clock: None,
        }
    }

    pub fn with_scheduler(mut self, name: impl Into<String>, scheduler: impl Scheduler + 'static) -> Self {
        self.schedulers.push((name.into(), Box::new(scheduler)));
        self
    }

    /// Evaluate schedulers against a fixed instant instead of the wall clock.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.clock = Some(now);
        self
    }

    pub fn scheduler_names(&self) -> impl Iterator<Item = &str> {
        self.schedulers.iter().map(|(name, _)| name.as_str())
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }
}

impl<L: Launcher> Job for TriggerScheduledJobsJob<L> {
    fn run(&mut self, scope: &mut ExecutionScope<'_>) -> BatchResult<JobOutcome> {
        let ctx = self.clock.map(ScheduleContext::at).unwrap_or_default();
        let logger = scope.logger();

        for (name, scheduler) in &self.schedulers {
            for due in scheduler.get(&ctx) {
                let job_name = due.job_name;
                let launched = match self.launcher.launch(&job_name, due.parameters, due.id) {
                    Ok(tree) => tree,
                    Err(err) => {
                        warn!(scheduler = %name, job = %job_name, error = %err, "launch failed, aborting trigger");
                        return Err(err);
                    }
                };

                let id = launched.id().clone();
                scope.summary_mut()?.append(
                    JOBS_KEY,
                    json!({ "scheduler": name, "job": job_name, "id": id.as_str() }),
                )?;

                let mut context = Map::new();
                context.insert("scheduler".into(), JsonValue::from(name.as_str()));
                context.insert("status".into(), JsonValue::from(launched.root_execution().status().as_str()));
                logger.log(LogLevel::Info, format!("launched `{job_name}` as {id}"), context);
                info!(scheduler = %name, job = %job_name, launched_id = %id, "scheduled job launched");
            }
        }

        Ok(JobOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use batchrun_core::{
        BatchError, ErrorKind, ExecutionId, ExecutionStatus, ExecutionTree, Parameters,
    };
    use batchrun_pipeline::run_job;
    use chrono::{Duration, TimeZone};

    use crate::time::{TimeScheduler, TimedJob};

    /// Records launch requests; names starting with `broken` fail.
    #[derive(Default)]
    struct RecordingLauncher {
        launched: Mutex<Vec<String>>,
    }

    impl Launcher for RecordingLauncher {
        fn launch(
            &self,
            job_name: &str,
            parameters: Parameters,
            id: Option<ExecutionId>,
        ) -> BatchResult<ExecutionTree> {
            if job_name.starts_with("broken") {
                return Err(BatchError::configuration(format!("unknown job `{job_name}`")));
            }
            self.launched.lock().unwrap().push(job_name.to_string());
            let id = id.unwrap_or_else(|| ExecutionId::from(format!("{job_name}-run")));
            Ok(ExecutionTree::with_root_id(id, job_name, parameters))
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn run_trigger(job: &mut TriggerScheduledJobsJob<&RecordingLauncher>) -> ExecutionTree {
        let mut tree = ExecutionTree::with_root_id("trigger-1".into(), "trigger", Parameters::new());
        let root = tree.root();
        run_job(job, &mut tree, root).unwrap();
        tree
    }

    #[test]
    fn records_each_launch_in_order() {
        let now = fixed_now();
        let launcher = RecordingLauncher::default();
        let mut job = TriggerScheduledJobsJob::new(&launcher)
            .with_scheduler(
                "daily",
                TimeScheduler::new([
                    TimedJob::new(now - Duration::hours(2), "export"),
                    TimedJob::new(now - Duration::hours(1), "cleanup").with_id("cleanup-fixed"),
                    TimedJob::new(now + Duration::hours(1), "later"),
                ]),
            )
            .at(now);

        let tree = run_trigger(&mut job);
        let exec = tree.root_execution();

        assert_eq!(exec.status(), ExecutionStatus::Completed);
        assert_eq!(
            exec.summary().get(JOBS_KEY),
            Some(&json!([
                {"scheduler": "daily", "job": "export", "id": "export-run"},
                {"scheduler": "daily", "job": "cleanup", "id": "cleanup-fixed"},
            ]))
        );
        assert_eq!(*launcher.launched.lock().unwrap(), vec!["export", "cleanup"]);
        assert_eq!(exec.log().len(), 2);
    }

    #[test]
    fn walks_schedulers_in_configuration_order() {
        let now = fixed_now();
        let launcher = RecordingLauncher::default();
        let mut job = TriggerScheduledJobsJob::new(&launcher)
            .with_scheduler("first", TimeScheduler::new([TimedJob::new(now, "a")]))
            .with_scheduler("second", TimeScheduler::new([TimedJob::new(now, "b")]))
            .at(now);

        let tree = run_trigger(&mut job);

        let jobs = tree.root_execution().summary().get(JOBS_KEY).cloned().unwrap();
        assert_eq!(jobs[0]["scheduler"], json!("first"));
        assert_eq!(jobs[1]["scheduler"], json!("second"));
        assert_eq!(job.scheduler_names().collect::<Vec<_>>(), vec!["first", "second"]);
    }

    #[test]
    fn first_launch_failure_aborts_the_run() {
        let now = fixed_now();
        let launcher = RecordingLauncher::default();
        let mut job = TriggerScheduledJobsJob::new(&launcher)
            .with_scheduler(
                "daily",
                TimeScheduler::new([
                    TimedJob::new(now, "ok"),
                    TimedJob::new(now, "broken"),
                    TimedJob::new(now, "never"),
                ]),
            )
            .at(now);

        let tree = run_trigger(&mut job);
        let exec = tree.root_execution();

        assert_eq!(exec.status(), ExecutionStatus::Failed);
        assert_eq!(exec.errors().len(), 1);
        assert_eq!(exec.errors()[0].kind, ErrorKind::Configuration);
        assert_eq!(*launcher.launched.lock().unwrap(), vec!["ok"]);
        assert_eq!(exec.summary().get(JOBS_KEY).and_then(|v| v.as_array()).map(Vec::len), Some(1));
    }

    #[test]
    fn nothing_due_leaves_summary_empty() {
        let launcher = RecordingLauncher::default();
        let mut job = TriggerScheduledJobsJob::new(&launcher)
            .with_scheduler("empty", TimeScheduler::default())
            .at(fixed_now());

        let tree = run_trigger(&mut job);

        assert_eq!(tree.root_execution().status(), ExecutionStatus::Completed);
        assert!(tree.root_execution().summary().get(JOBS_KEY).is_none());
    }
}
