//! Embedder-facing facade: schedule, stop and finish background fetch tasks.

use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, Mutex, PoisonError},
};

use bgf_model::{DispatchEvent, EventKind, FetchStatus, JobId, ScheduleKind, TaskConfig, TaskId};
use tracing::{debug, info, instrument, warn};

use crate::{
    dispatch::{AlarmDispatcher, BootReceiver, BootReconciler, Dispatcher, JobDispatcher},
    error::CoreError,
    os::{AlarmRequest, JobRequest, OsScheduler},
    schedule::ScheduleBook,
    wakelock::PowerManager,
};

pub struct BackgroundFetch {
    dispatcher: Dispatcher,
    scheduler: Arc<dyn OsScheduler>,
    schedules: ScheduleBook,
    jobs: Mutex<HashMap<TaskId, JobId>>,
}

impl BackgroundFetch {
    pub fn new(dispatcher: Dispatcher, scheduler: Arc<dyn OsScheduler>) -> Self {
        Self {
            dispatcher,
            scheduler,
            schedules: ScheduleBook::new(),
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Start from a previously persisted schedule book.
    pub fn with_schedules(mut self, schedules: ScheduleBook) -> Self {
        self.schedules = schedules;
        self
    }

    #[inline]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    #[inline]
    pub fn schedules(&self) -> &ScheduleBook {
        &self.schedules
    }

    pub fn job_dispatcher(&self) -> JobDispatcher {
        JobDispatcher::new(self.dispatcher.clone(), Arc::clone(&self.scheduler))
    }

    pub fn alarm_dispatcher(&self, power: Arc<dyn PowerManager>) -> AlarmDispatcher {
        AlarmDispatcher::new(self.dispatcher.clone(), power)
    }

    /// Boot receiver reconciling this facade's schedule book on the dispatcher's
    /// blocking pool.
    pub fn boot_receiver(&self) -> BootReceiver {
        let reconciler = BootReconciler::new(
            self.schedules.clone(),
            Arc::clone(&self.scheduler),
            Arc::clone(self.dispatcher.clock()),
            self.dispatcher.bus().clone(),
        );
        BootReceiver::new(reconciler, self.dispatcher.handle().clone())
    }

    /// Schedule `config` if background fetch is available on this device.
    ///
    /// Returns the device status either way; nothing is scheduled unless it is
    /// [`FetchStatus::Available`].
    #[instrument(level = "info", skip_all, fields(task_id = %config.task_id))]
    pub fn configure(&self, config: TaskConfig) -> Result<FetchStatus, CoreError> {
        let status = self.status();
        if !status.is_available() {
            warn!(?status, "background fetch unavailable; nothing scheduled");
            return Ok(status);
        }
        self.schedule_task(config)?;
        Ok(status)
    }

    /// Schedule `config`, replacing any schedule with the same id.
    #[instrument(level = "debug", skip_all, fields(task_id = %config.task_id))]
    pub fn schedule_task(&self, config: TaskConfig) -> Result<ScheduleKind, CoreError> {
        config.validate()?;
        self.cancel(&config.task_id);

        let now = self.dispatcher.clock().now_millis();
        let kind = config.schedule_kind(self.scheduler.has_job_scheduler());
        match kind {
            ScheduleKind::Job => {
                let job = self
                    .scheduler
                    .schedule_job(&JobRequest::from_config(&config, now))?;
                self.jobs().insert(config.task_id.clone(), job);
            }
            ScheduleKind::Alarm => {
                self.scheduler
                    .set_alarm(&AlarmRequest::from_config(&config, now))?;
            }
        }

        info!(?kind, delay = config.delay, periodic = config.periodic, "task scheduled");
        self.dispatcher.publish(
            DispatchEvent::new(EventKind::TaskScheduled)
                .with_task(&config.task_id)
                .with_reason(format!("{kind:?}")),
        );
        self.schedules.put(config);
        Ok(kind)
    }

    /// Stop one task, or every known task when `task_id` is `None`.
    ///
    /// Cancels the OS schedule, forgets the config and settles any in-flight
    /// execution. Returns how many scheduled tasks were stopped.
    #[instrument(level = "info", skip(self))]
    pub fn stop(&self, task_id: Option<&TaskId>) -> usize {
        let ids: BTreeSet<TaskId> = match task_id {
            Some(id) => BTreeSet::from([id.clone()]),
            None => self
                .schedules
                .list()
                .into_iter()
                .map(|c| c.task_id)
                .chain(self.jobs().keys().cloned())
                .chain(self.dispatcher.registry().task_ids())
                .collect(),
        };

        let mut stopped = 0;
        for id in ids {
            let had_schedule = self.cancel(&id) | self.schedules.remove(&id).is_some();
            if self.dispatcher.finish(&id) {
                debug!(task_id = %id, "in-flight execution settled");
            }
            if had_schedule {
                stopped += 1;
                self.dispatcher
                    .publish(DispatchEvent::new(EventKind::TaskStopped).with_task(&id));
            }
        }
        info!(stopped, "tasks stopped");
        stopped
    }

    /// The payload is done with `task_id`.
    pub fn finish(&self, task_id: &TaskId) -> bool {
        self.dispatcher.finish(task_id)
    }

    pub fn status(&self) -> FetchStatus {
        self.scheduler.status()
    }

    fn cancel(&self, task_id: &TaskId) -> bool {
        let mut cancelled = false;
        if let Some(job) = self.jobs().remove(task_id) {
            self.scheduler.cancel_job(job);
            cancelled = true;
        }
        if self.scheduler.is_alarm_armed(task_id) {
            self.scheduler.cancel_alarm(task_id);
            cancelled = true;
        }
        cancelled
    }

    fn jobs(&self) -> std::sync::MutexGuard<'_, HashMap<TaskId, JobId>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::DispatchConfig,
        dispatch::JobParameters,
        subscriber::Subscribe,
        testing::{FakeHost, FakeRuntime, FakeScheduler, ManualClock, RecordingSubscriber},
    };
    use bgf_model::{DispatchState, JobExtras, ModelError};

    fn facade(scheduler: &Arc<FakeScheduler>) -> (BackgroundFetch, Arc<RecordingSubscriber>) {
        let events = RecordingSubscriber::new();
        let dispatcher = Dispatcher::builder(DispatchConfig::default().with_grace_delay_ms(5))
            .with_host(FakeHost::with(FakeRuntime::ready()))
            .with_clock(ManualClock::at(50_000))
            .with_subscribers(vec![events.clone() as Arc<dyn Subscribe>])
            .build()
            .unwrap();
        (BackgroundFetch::new(dispatcher, scheduler.clone()), events)
    }

    #[tokio::test]
    async fn schedules_a_job_with_stamped_extras() {
        let scheduler = FakeScheduler::new();
        let (fetch, events) = facade(&scheduler);

        let kind = fetch
            .schedule_task(TaskConfig::new("sync", 60_000).with_periodic(true))
            .unwrap();

        assert_eq!(kind, ScheduleKind::Job);
        let (_, req) = scheduler.job_for(&TaskId::from("sync")).unwrap();
        assert_eq!(req.extras.scheduled_at, 50_000);
        assert!(req.periodic);
        assert_eq!(fetch.schedules().len(), 1);
        assert_eq!(events.count(EventKind::TaskScheduled), 1);
    }

    #[tokio::test]
    async fn forced_alarm_uses_the_alarm_service() {
        let scheduler = FakeScheduler::new();
        let (fetch, _) = facade(&scheduler);

        let kind = fetch
            .schedule_task(TaskConfig::new("sync", 60_000).with_force_alarm_manager(true))
            .unwrap();

        assert_eq!(kind, ScheduleKind::Alarm);
        assert_eq!(
            scheduler.alarm(&TaskId::from("sync")).unwrap().trigger_at,
            110_000
        );
        assert!(scheduler.jobs().is_empty());
    }

    #[tokio::test]
    async fn huge_alarm_delay_clamps_the_trigger() {
        let scheduler = FakeScheduler::new();
        let (fetch, _) = facade(&scheduler);

        fetch
            .schedule_task(TaskConfig::new("huge", u64::MAX).with_force_alarm_manager(true))
            .unwrap();

        assert_eq!(
            scheduler.alarm(&TaskId::from("huge")).unwrap().trigger_at,
            u64::MAX
        );
    }

    #[tokio::test]
    async fn rescheduling_replaces_the_previous_job() {
        let scheduler = FakeScheduler::new();
        let (fetch, _) = facade(&scheduler);

        fetch.schedule_task(TaskConfig::new("sync", 60_000)).unwrap();
        let (first, _) = scheduler.job_for(&TaskId::from("sync")).unwrap();
        fetch.schedule_task(TaskConfig::new("sync", 90_000)).unwrap();

        assert_eq!(scheduler.cancelled_jobs(), vec![first]);
        assert_eq!(scheduler.jobs().len(), 1);
        assert_eq!(
            fetch.schedules().get(&TaskId::from("sync")).unwrap().delay,
            90_000
        );
    }

    #[tokio::test]
    async fn invalid_configs_are_rejected() {
        let scheduler = FakeScheduler::new();
        let (fetch, _) = facade(&scheduler);

        let err = fetch.schedule_task(TaskConfig::new("sync", 0)).unwrap_err();
        assert_eq!(err, CoreError::InvalidConfig(ModelError::ZeroDelay));

        let err = fetch.schedule_task(TaskConfig::new("", 1_000)).unwrap_err();
        assert_eq!(err, CoreError::InvalidConfig(ModelError::EmptyTaskId));
        assert!(fetch.schedules().is_empty());
    }

    #[tokio::test]
    async fn configure_skips_scheduling_when_unavailable() {
        let scheduler = FakeScheduler::new();
        scheduler.set_status(FetchStatus::Denied);
        let (fetch, _) = facade(&scheduler);

        let status = fetch.configure(TaskConfig::fetch(0)).unwrap();

        assert_eq!(status, FetchStatus::Denied);
        assert!(scheduler.jobs().is_empty());
    }

    #[tokio::test]
    async fn stop_all_cancels_and_settles_in_flight_work() {
        let scheduler = FakeScheduler::new();
        let (fetch, events) = facade(&scheduler);
        fetch.schedule_task(TaskConfig::new("a", 60_000)).unwrap();
        fetch
            .schedule_task(TaskConfig::new("b", 60_000).with_force_alarm_manager(true))
            .unwrap();

        // The OS fires the job well after the schedule was stamped.
        let (job, _) = scheduler.job_for(&TaskId::from("a")).unwrap();
        let state = fetch
            .job_dispatcher()
            .on_start_job(&JobParameters::new(job, JobExtras::new("a", 10_000)));
        assert_eq!(state, DispatchState::Running);

        assert_eq!(fetch.stop(None), 2);

        assert!(fetch.schedules().is_empty());
        assert!(scheduler.jobs().is_empty());
        assert_eq!(scheduler.alarm_count(), 0);
        assert_eq!(scheduler.finished_jobs(), vec![(job, false)]);
        assert_eq!(events.count(EventKind::TaskStopped), 2);
    }

    #[tokio::test]
    async fn stopping_an_unknown_task_is_a_no_op() {
        let scheduler = FakeScheduler::new();
        let (fetch, _) = facade(&scheduler);
        assert_eq!(fetch.stop(Some(&TaskId::from("ghost"))), 0);
    }
}
