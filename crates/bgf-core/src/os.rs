//! Seams onto the OS scheduling primitives.

use bgf_model::{EpochMillis, FetchStatus, JobExtras, JobId, NetworkType, TaskConfig, TaskId};

use crate::error::CoreError;

/// Request to register a job with the OS job scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub extras: JobExtras,
    pub delay_ms: u64,
    pub periodic: bool,
    /// Ask the OS to keep the job across reboots.
    pub persisted: bool,
    pub network: NetworkType,
    pub requires_battery_not_low: bool,
    pub requires_storage_not_low: bool,
    pub requires_charging: bool,
    pub requires_device_idle: bool,
}

impl JobRequest {
    pub fn from_config(config: &TaskConfig, now: EpochMillis) -> Self {
        Self {
            extras: JobExtras::new(config.task_id.clone(), now),
            delay_ms: config.delay,
            periodic: config.periodic,
            persisted: config.survives_boot(),
            network: config.required_network_type,
            requires_battery_not_low: config.requires_battery_not_low,
            requires_storage_not_low: config.requires_storage_not_low,
            requires_charging: config.requires_charging,
            requires_device_idle: config.requires_device_idle,
        }
    }

    #[inline]
    pub fn task_id(&self) -> &TaskId {
        &self.extras.task_id
    }
}

/// Request to arm a wake-up alarm whose broadcast action is the task id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmRequest {
    pub task_id: TaskId,
    pub trigger_at: EpochMillis,
    /// Repeat interval for periodic tasks.
    pub interval_ms: Option<u64>,
}

impl AlarmRequest {
    pub fn from_config(config: &TaskConfig, now: EpochMillis) -> Self {
        Self {
            task_id: config.task_id.clone(),
            trigger_at: now.saturating_add(config.delay),
            interval_ms: config.periodic.then_some(config.delay),
        }
    }
}

/// The OS job scheduler and alarm service.
///
/// Calls arrive from arbitrary threads; implementations must be thread-safe.
pub trait OsScheduler: Send + Sync + 'static {
    /// Whether the platform offers a job scheduler; alarms are used otherwise.
    fn has_job_scheduler(&self) -> bool;

    fn schedule_job(&self, request: &JobRequest) -> Result<JobId, CoreError>;

    fn cancel_job(&self, job: JobId);

    /// Tell the OS a job callback is done.
    fn job_finished(&self, job: JobId, reschedule: bool);

    fn set_alarm(&self, request: &AlarmRequest) -> Result<(), CoreError>;

    fn cancel_alarm(&self, task_id: &TaskId);

    fn is_alarm_armed(&self, task_id: &TaskId) -> bool;

    fn status(&self) -> FetchStatus;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_request_stamps_schedule_time() {
        let cfg = TaskConfig::new("sync", 60_000)
            .with_periodic(true)
            .with_start_on_boot(true)
            .with_stop_on_terminate(false);
        let req = JobRequest::from_config(&cfg, 1_000);

        assert_eq!(req.extras.scheduled_at, 1_000);
        assert_eq!(req.task_id(), &TaskId::from("sync"));
        assert!(req.periodic);
        assert!(req.persisted);
    }

    #[test]
    fn alarm_request_repeats_only_when_periodic() {
        let one_shot = AlarmRequest::from_config(&TaskConfig::new("a", 5_000), 100);
        assert_eq!(one_shot.trigger_at, 5_100);
        assert_eq!(one_shot.interval_ms, None);

        let periodic =
            AlarmRequest::from_config(&TaskConfig::new("a", 5_000).with_periodic(true), 100);
        assert_eq!(periodic.interval_ms, Some(5_000));
    }

    #[test]
    fn alarm_trigger_saturates_on_huge_delay() {
        let cfg = TaskConfig::new("huge", u64::MAX);
        assert!(cfg.validate().is_ok());
        assert_eq!(AlarmRequest::from_config(&cfg, 1_000).trigger_at, u64::MAX);
    }
}
