use std::sync::Arc;

use bgf_model::{DispatchEvent, EventKind, JobId, TaskId};
use tracing::{debug, instrument, warn};

use crate::{
    completion::CompletionHandler,
    subscriber::EventBus,
    task::BgTask,
    wakelock::{PowerManager, WakeLock},
};

use super::Dispatcher;

/// Releases the alarm's wake-lock if it is still held.
struct WakeLockCompletion {
    lock: Arc<dyn WakeLock>,
    bus: EventBus,
    task_id: TaskId,
}

impl CompletionHandler for WakeLockCompletion {
    fn finish(&self) {
        if !self.lock.is_held() {
            return;
        }
        self.lock.release();
        debug!(tag = self.lock.tag(), "wake-lock released");
        self.bus.publish(
            DispatchEvent::new(EventKind::WakeLockReleased)
                .with_task(&self.task_id)
                .with_reason(self.lock.tag()),
        );
    }
}

/// Entry point for alarm broadcasts on platforms (or tasks) without a job scheduler.
#[derive(Clone)]
pub struct AlarmDispatcher {
    dispatcher: Dispatcher,
    power: Arc<dyn PowerManager>,
}

impl AlarmDispatcher {
    pub fn new(dispatcher: Dispatcher, power: Arc<dyn PowerManager>) -> Self {
        Self { dispatcher, power }
    }

    /// An alarm fired; `action` carries the task id.
    ///
    /// Holds a wake-lock bounded to the execution window plus buffer until the
    /// descriptor settles.
    #[instrument(level = "debug", skip(self))]
    pub fn on_receive(&self, action: &str) -> Arc<BgTask> {
        let config = self.dispatcher.config();
        let task_id = TaskId::from(action);

        let tag = format!("{}::{}", config.wake_lock_tag, action);
        let lock = self.power.new_wake_lock(&tag);
        lock.acquire(config.wake_lock_bound());
        self.dispatcher.publish(
            DispatchEvent::new(EventKind::WakeLockAcquired)
                .with_task(&task_id)
                .with_reason(tag),
        );

        let task = Arc::new(BgTask::new(
            task_id.clone(),
            JobId::NONE,
            self.dispatcher.clock().now_millis(),
            config.max_execution(),
            WakeLockCompletion {
                lock,
                bus: self.dispatcher.bus().clone(),
                task_id,
            },
        ));
        self.dispatcher.dispatch(Arc::clone(&task));

        if config.alarm_watchdog {
            self.watch(Arc::clone(&task));
        }
        task
    }

    fn watch(&self, task: Arc<BgTask>) {
        let dispatcher = self.dispatcher.clone();
        self.dispatcher.handle().spawn(async move {
            tokio::select! {
                _ = task.finished() => {}
                _ = tokio::time::sleep(task.max_execution()) => {
                    if dispatcher.timeout_task(&task) {
                        warn!(task_id = %task.task_id(), "alarm task still running after its execution window; forced timeout");
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        config::DispatchConfig,
        subscriber::Subscribe,
        testing::{FakeHost, FakeRuntime, RecordingPowerManager, RecordingSubscriber, wait_until},
    };

    fn alarms(
        config: DispatchConfig,
    ) -> (
        AlarmDispatcher,
        Dispatcher,
        Arc<RecordingPowerManager>,
        Arc<RecordingSubscriber>,
    ) {
        let events = RecordingSubscriber::new();
        let power = RecordingPowerManager::new();
        let dispatcher = Dispatcher::builder(config.with_grace_delay_ms(5))
            .with_host(FakeHost::with(FakeRuntime::ready()))
            .with_subscribers(vec![events.clone() as Arc<dyn Subscribe>])
            .build()
            .unwrap();
        (
            AlarmDispatcher::new(dispatcher.clone(), power.clone()),
            dispatcher,
            power,
            events,
        )
    }

    #[tokio::test]
    async fn wake_lock_is_tagged_and_bounded() {
        let (alarms, _, power, _) = alarms(DispatchConfig::default());

        let task = alarms.on_receive("sync");

        let locks = power.locks();
        assert_eq!(locks.len(), 1);
        assert_eq!(locks[0].tag(), "TSBackgroundFetch::sync");
        assert_eq!(locks[0].acquire_timeouts(), vec![Duration::from_millis(29_000)]);
        assert!(locks[0].is_held());
        assert_eq!(task.job_id(), JobId::NONE);
    }

    #[tokio::test]
    async fn repeated_finish_releases_once() {
        let (alarms, dispatcher, power, events) = alarms(DispatchConfig::default());
        alarms.on_receive("sync");

        for _ in 0..3 {
            dispatcher.finish(&TaskId::from("sync"));
        }

        let lock = &power.locks()[0];
        assert!(!lock.is_held());
        assert_eq!(lock.releases(), 1);
        assert_eq!(events.count(EventKind::WakeLockReleased), 1);
    }

    #[tokio::test]
    async fn watchdog_times_out_a_lingering_task() {
        let (alarms, dispatcher, power, events) =
            alarms(DispatchConfig::default().with_max_execution_ms(50));
        let task = alarms.on_receive("sync");

        assert!(wait_until(|| task.is_finished()).await);
        assert!(task.timed_out());
        assert!(!power.locks()[0].is_held());
        assert_eq!(events.count(EventKind::TaskTimedOut), 1);
        assert!(dispatcher.registry().is_empty());
    }

    #[tokio::test]
    async fn watchdog_can_be_turned_off() {
        let (alarms, dispatcher, power, _) = alarms(
            DispatchConfig::default()
                .with_max_execution_ms(20)
                .with_alarm_watchdog(false),
        );
        let task = alarms.on_receive("sync");

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!task.is_finished());
        assert!(power.locks()[0].is_held());
        assert_eq!(dispatcher.registry().len(), 1);
    }
}
