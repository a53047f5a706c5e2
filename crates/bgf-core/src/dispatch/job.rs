use std::sync::Arc;

use bgf_model::{DispatchEvent, DispatchState, EventKind, JobExtras, JobId};
use tracing::{debug, instrument};

use crate::{completion::CompletionHandler, os::OsScheduler, task::BgTask};

use super::Dispatcher;

/// What the OS job scheduler hands to a job callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobParameters {
    pub job_id: JobId,
    pub extras: JobExtras,
}

impl JobParameters {
    pub fn new(job_id: JobId, extras: JobExtras) -> Self {
        Self { job_id, extras }
    }
}

/// Tells the OS the job is done, without asking for an immediate reschedule.
struct JobCompletion {
    scheduler: Arc<dyn OsScheduler>,
    job_id: JobId,
}

impl CompletionHandler for JobCompletion {
    fn finish(&self) {
        self.scheduler.job_finished(self.job_id, false);
    }
}

/// Entry point for OS job-scheduler callbacks.
#[derive(Clone)]
pub struct JobDispatcher {
    dispatcher: Dispatcher,
    scheduler: Arc<dyn OsScheduler>,
}

impl JobDispatcher {
    pub fn new(dispatcher: Dispatcher, scheduler: Arc<dyn OsScheduler>) -> Self {
        Self {
            dispatcher,
            scheduler,
        }
    }

    /// The OS started the job.
    ///
    /// Jobs firing within the spurious window of being scheduled are completed on
    /// the spot; anything else is dispatched and keeps running until finished.
    #[instrument(level = "debug", skip_all, fields(task_id = %params.extras.task_id, job = %params.job_id))]
    pub fn on_start_job(&self, params: &JobParameters) -> DispatchState {
        let now = self.dispatcher.clock().now_millis();
        let elapsed = params.extras.elapsed_since_schedule(now);

        if elapsed < self.dispatcher.config().spurious_window_ms {
            debug!(elapsed, "job fired right after scheduling; ignored");
            self.dispatcher.publish(
                DispatchEvent::new(EventKind::SpuriousFireIgnored)
                    .with_task(&params.extras.task_id)
                    .with_job(params.job_id)
                    .with_reason(format!("fired {elapsed}ms after scheduling")),
            );
            self.scheduler.job_finished(params.job_id, false);
            return DispatchState::Completed;
        }

        let task = BgTask::new(
            params.extras.task_id.clone(),
            params.job_id,
            params.extras.scheduled_at,
            self.dispatcher.config().max_execution(),
            JobCompletion {
                scheduler: Arc::clone(&self.scheduler),
                job_id: params.job_id,
            },
        );
        self.dispatcher.dispatch(Arc::new(task));
        DispatchState::Running
    }

    /// The OS is taking the job away.
    #[instrument(level = "debug", skip_all, fields(task_id = %params.extras.task_id, job = %params.job_id))]
    pub fn on_stop_job(&self, params: &JobParameters) -> DispatchState {
        // A settled descriptor already told the OS through its completion.
        if !self
            .dispatcher
            .timeout(&params.extras.task_id, Some(params.job_id))
        {
            self.scheduler.job_finished(params.job_id, false);
        }
        DispatchState::StoppedByOs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::DispatchConfig,
        subscriber::Subscribe,
        testing::{FakeHost, FakeRuntime, FakeScheduler, ManualClock, RecordingSubscriber},
    };
    use bgf_model::TaskId;

    struct Fixture {
        jobs: JobDispatcher,
        dispatcher: Dispatcher,
        runtime: Arc<FakeRuntime>,
        scheduler: Arc<FakeScheduler>,
        clock: Arc<ManualClock>,
        events: Arc<RecordingSubscriber>,
    }

    fn fixture() -> Fixture {
        let runtime = FakeRuntime::ready();
        let scheduler = FakeScheduler::new();
        let clock = ManualClock::at(100_000);
        let events = RecordingSubscriber::new();
        let dispatcher = Dispatcher::builder(DispatchConfig::default().with_grace_delay_ms(5))
            .with_host(FakeHost::with(runtime.clone()))
            .with_clock(clock.clone())
            .with_subscribers(vec![events.clone() as Arc<dyn Subscribe>])
            .build()
            .unwrap();
        Fixture {
            jobs: JobDispatcher::new(dispatcher.clone(), scheduler.clone()),
            dispatcher,
            runtime,
            scheduler,
            clock,
            events,
        }
    }

    fn params(job: i32, scheduled_at: u64) -> JobParameters {
        JobParameters::new(JobId::new(job), JobExtras::new("sync", scheduled_at))
    }

    #[tokio::test]
    async fn spurious_fire_completes_without_invoking() {
        let f = fixture();

        let state = f.jobs.on_start_job(&params(7, 100_000 - 999));

        assert_eq!(state, DispatchState::Completed);
        assert_eq!(f.scheduler.finished_jobs(), vec![(JobId::new(7), false)]);
        assert!(f.dispatcher.registry().is_empty());
        assert_eq!(f.events.count(EventKind::SpuriousFireIgnored), 1);
        assert_eq!(f.runtime.create_calls(), 0);
        assert!(f.runtime.started().is_empty());
    }

    #[tokio::test]
    async fn fire_past_window_invokes_once() {
        let f = fixture();
        f.clock.set(101_000);

        let state = f.jobs.on_start_job(&params(7, 100_000));

        assert_eq!(state, DispatchState::Running);
        assert!(f.runtime.wait_for_started(1).await);
        assert_eq!(f.runtime.started().len(), 1);
        assert!(f.scheduler.finished_jobs().is_empty());

        f.dispatcher.finish(&TaskId::from("sync"));
        assert_eq!(f.scheduler.finished_jobs(), vec![(JobId::new(7), false)]);
    }

    #[tokio::test]
    async fn stop_times_out_once_and_tells_the_os_once() {
        let f = fixture();
        f.jobs.on_start_job(&params(7, 0));

        assert_eq!(f.jobs.on_stop_job(&params(7, 0)), DispatchState::StoppedByOs);
        assert_eq!(f.scheduler.finished_jobs(), vec![(JobId::new(7), false)]);
        assert_eq!(f.events.count(EventKind::TaskTimedOut), 1);

        f.jobs.on_stop_job(&params(7, 0));
        assert_eq!(f.events.count(EventKind::TaskTimedOut), 1);
        assert_eq!(f.events.count(EventKind::StopUnknownTask), 1);

        // Finishing after the timeout does not reach the OS again.
        assert!(!f.dispatcher.finish(&TaskId::from("sync")));
        assert_eq!(f.scheduler.finished_jobs().len(), 2);
    }

    #[tokio::test]
    async fn stop_for_unknown_job_only_informs_the_os() {
        let f = fixture();

        let state = f.jobs.on_stop_job(&params(9, 0));

        assert_eq!(state, DispatchState::StoppedByOs);
        assert_eq!(f.scheduler.finished_jobs(), vec![(JobId::new(9), false)]);
        assert_eq!(f.events.count(EventKind::TaskTimedOut), 0);
    }
}
