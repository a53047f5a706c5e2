use std::sync::Arc;

use bgf_model::{DispatchEvent, EventKind, ScheduleKind};
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, info, instrument, warn};

use crate::{
    clock::Clock,
    os::{AlarmRequest, OsScheduler},
    schedule::ScheduleBook,
    subscriber::EventBus,
};

/// Brings the schedule book back in line with the OS after a reboot.
pub struct BootReconciler {
    schedules: ScheduleBook,
    scheduler: Arc<dyn OsScheduler>,
    clock: Arc<dyn Clock>,
    bus: EventBus,
}

impl BootReconciler {
    pub fn new(
        schedules: ScheduleBook,
        scheduler: Arc<dyn OsScheduler>,
        clock: Arc<dyn Clock>,
        bus: EventBus,
    ) -> Self {
        Self {
            schedules,
            scheduler,
            clock,
            bus,
        }
    }

    /// Drops configs that do not survive a reboot and re-arms missing alarms.
    ///
    /// Job-backed configs are persisted by the OS itself. Returns the number of
    /// alarms re-armed.
    pub fn on_boot(&self) -> usize {
        let has_jobs = self.scheduler.has_job_scheduler();
        let now = self.clock.now_millis();
        let (mut dropped, mut rearmed) = (0usize, 0usize);

        for config in self.schedules.list() {
            if !config.survives_boot() {
                debug!(task_id = %config.task_id, "config does not survive reboot; dropped");
                self.schedules.remove(&config.task_id);
                dropped += 1;
                continue;
            }
            if config.schedule_kind(has_jobs) != ScheduleKind::Alarm
                || self.scheduler.is_alarm_armed(&config.task_id)
            {
                continue;
            }
            match self.scheduler.set_alarm(&AlarmRequest::from_config(&config, now)) {
                Ok(()) => rearmed += 1,
                Err(e) => warn!(task_id = %config.task_id, error = %e, "failed to re-arm alarm"),
            }
        }

        info!(rearmed, dropped, "boot reconciliation complete");
        self.bus.publish(
            DispatchEvent::new(EventKind::BootReconciled)
                .with_reason(format!("rearmed={rearmed} dropped={dropped}")),
        );
        rearmed
    }
}

/// Entry point for the OS boot broadcast.
#[derive(Clone)]
pub struct BootReceiver {
    reconciler: Arc<BootReconciler>,
    pool: Handle,
}

impl BootReceiver {
    pub fn new(reconciler: BootReconciler, pool: Handle) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
            pool,
        }
    }

    /// Hands reconciliation to the blocking pool and returns at once.
    #[instrument(level = "debug", skip(self))]
    pub fn on_receive(&self, action: &str) -> JoinHandle<usize> {
        let reconciler = Arc::clone(&self.reconciler);
        self.pool.spawn_blocking(move || reconciler.on_boot())
    }
}
