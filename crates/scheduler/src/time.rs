//! Fixed-timetable scheduler.

use chrono::{DateTime, Utc};

use batchrun_core::{ExecutionId, Parameters};

use crate::scheduler::{ScheduleContext, ScheduledJob, Scheduler};

/// One timetable entry: a job that becomes due at `at`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedJob {
    pub at: DateTime<Utc>,
    pub job: ScheduledJob,
}

impl TimedJob {
    pub fn new(at: DateTime<Utc>, job_name: impl Into<String>) -> Self {
        Self {
            at,
            job: ScheduledJob::new(job_name),
        }
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.job.parameters = parameters;
        self
    }

    pub fn with_id(mut self, id: impl Into<ExecutionId>) -> Self {
        self.job.id = Some(id.into());
        self
    }
}

/// Yields every entry whose time is at or before `now`, in timetable order.
///
/// Entries are not consumed: an entry stays due on every later call.
#[derive(Debug, Clone, Default)]
pub struct TimeScheduler {
    entries: Vec<TimedJob>,
}

impl TimeScheduler {
    pub fn new(entries: impl IntoIterator<Item = TimedJob>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn push(&mut self, entry: TimedJob) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TimedJob] {
        &self.entries
    }
}

impl FromIterator<TimedJob> for TimeScheduler {
    fn from_iter<T: IntoIterator<Item = TimedJob>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl Scheduler for TimeScheduler {
    fn get(&self, ctx: &ScheduleContext) -> Box<dyn Iterator<Item = ScheduledJob> + '_> {
        let now = ctx.now;
        Box::new(
            self.entries
                .iter()
                .filter(move |entry| entry.at <= now)
                .map(|entry| entry.job.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn yields_past_entries_in_input_order() {
        let now = fixed_now();
        let scheduler = TimeScheduler::new([
            TimedJob::new(now - Duration::days(1), "A"),
            TimedJob::new(now + Duration::days(1), "B"),
            TimedJob::new(now - Duration::seconds(1), "C")
                .with_parameters(Parameters::new())
                .with_id("C-id"),
        ]);

        let due: Vec<_> = scheduler.get(&ScheduleContext::at(now)).collect();

        assert_eq!(due.len(), 2);
        assert_eq!(due[0].job_name, "A");
        assert!(due[0].parameters.is_empty());
        assert_eq!(due[0].id, None);
        assert_eq!(due[1].job_name, "C");
        assert_eq!(due[1].id, Some(ExecutionId::from("C-id")));
    }

    #[test]
    fn entry_exactly_at_now_is_due() {
        let now = fixed_now();
        let scheduler: TimeScheduler = [TimedJob::new(now, "edge")].into_iter().collect();
        assert_eq!(scheduler.get(&ScheduleContext::at(now)).count(), 1);
    }

    #[test]
    fn repeated_calls_yield_the_same_set() {
        let now = fixed_now();
        let scheduler = TimeScheduler::new([
            TimedJob::new(now - Duration::minutes(5), "x"),
            TimedJob::new(now - Duration::minutes(1), "y"),
        ]);
        let ctx = ScheduleContext::at(now);

        let first: Vec<_> = scheduler.get(&ctx).collect();
        let second: Vec<_> = scheduler.get(&ctx).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_timetable_yields_nothing() {
        let scheduler = TimeScheduler::default();
        assert_eq!(scheduler.get(&ScheduleContext::default()).count(), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

        #[test]
        fn due_set_is_the_ordered_past_subset(offsets in proptest::collection::vec(-1_000i64..1_000, 0..32)) {
            let now = fixed_now();
            let scheduler = TimeScheduler::new(
                offsets
                    .iter()
                    .enumerate()
                    .map(|(i, secs)| TimedJob::new(now + Duration::seconds(*secs), format!("job-{i}"))),
            );

            let due: Vec<String> = scheduler
                .get(&ScheduleContext::at(now))
                .map(|job| job.job_name)
                .collect();
            let expected: Vec<String> = offsets
                .iter()
                .enumerate()
                .filter(|(_, secs)| **secs <= 0)
                .map(|(i, _)| format!("job-{i}"))
                .collect();

            prop_assert_eq!(due, expected);
        }
    }
}
