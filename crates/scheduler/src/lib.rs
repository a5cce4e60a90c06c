//! Time-based scheduling and the trigger job that launches due work.
//!
//! Schedulers only decide *what* is due; launching goes through a [`Launcher`],
//! which this crate leaves to the embedding application.

pub mod launcher;
pub mod scheduler;
pub mod time;
pub mod trigger;

pub use launcher::Launcher;
pub use scheduler::{ScheduleContext, ScheduledJob, Scheduler};
pub use time::{TimeScheduler, TimedJob};
pub use trigger::{TriggerScheduledJobsJob, JOBS_KEY};
