use serde::{Deserialize, Serialize};

use crate::{FETCH_TASK_ID, MIN_FETCH_INTERVAL_MS, ModelError, NetworkType, TaskId};

/// Scheduling configuration for one logical task.
///
/// Field names follow the JavaScript-facing configuration object, so a config
/// serialized by the application can be fed back unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskConfig {
    /// Name of the task; also the key used when the payload reports completion.
    pub task_id: TaskId,
    /// Minimum interval between executions, in milliseconds.
    pub delay: u64,
    /// Whether the task repeats or is a one-shot.
    #[serde(default)]
    pub periodic: bool,
    /// Stop firing once the user terminates the application.
    #[serde(default = "default_true")]
    pub stop_on_terminate: bool,
    /// Re-establish the schedule after the device reboots.
    #[serde(default)]
    pub start_on_boot: bool,
    /// Deliver events through the headless runtime after termination.
    #[serde(default)]
    pub enable_headless: bool,
    /// Use the alarm fallback even when a job scheduler exists.
    #[serde(default)]
    pub force_alarm_manager: bool,
    #[serde(default)]
    pub required_network_type: NetworkType,
    #[serde(default)]
    pub requires_battery_not_low: bool,
    #[serde(default)]
    pub requires_storage_not_low: bool,
    #[serde(default)]
    pub requires_charging: bool,
    #[serde(default)]
    pub requires_device_idle: bool,
}

fn default_true() -> bool {
    true
}

/// OS primitive a task is scheduled through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleKind {
    Job,
    Alarm,
}

impl TaskConfig {
    /// One-shot task with default constraints.
    pub fn new(task_id: impl Into<TaskId>, delay: u64) -> Self {
        Self {
            task_id: task_id.into(),
            delay,
            periodic: false,
            stop_on_terminate: true,
            start_on_boot: false,
            enable_headless: false,
            force_alarm_manager: false,
            required_network_type: NetworkType::None,
            requires_battery_not_low: false,
            requires_storage_not_low: false,
            requires_charging: false,
            requires_device_idle: false,
        }
    }

    /// The default periodic fetch task, firing at most every `interval_ms`
    /// (clamped to the OS minimum of 15 minutes).
    pub fn fetch(interval_ms: u64) -> Self {
        Self::new(FETCH_TASK_ID, interval_ms.max(MIN_FETCH_INTERVAL_MS)).with_periodic(true)
    }

    pub fn with_periodic(mut self, periodic: bool) -> Self {
        self.periodic = periodic;
        self
    }

    pub fn with_stop_on_terminate(mut self, stop: bool) -> Self {
        self.stop_on_terminate = stop;
        self
    }

    pub fn with_start_on_boot(mut self, start: bool) -> Self {
        self.start_on_boot = start;
        self
    }

    pub fn with_headless(mut self, enable: bool) -> Self {
        self.enable_headless = enable;
        self
    }

    pub fn with_force_alarm_manager(mut self, force: bool) -> Self {
        self.force_alarm_manager = force;
        self
    }

    pub fn with_network(mut self, network: NetworkType) -> Self {
        self.required_network_type = network;
        self
    }

    #[inline]
    pub fn is_fetch_task(&self) -> bool {
        self.task_id.as_str() == FETCH_TASK_ID
    }

    /// Returns `true` if the schedule must be re-armed after a reboot.
    ///
    /// Tasks that stop on terminate, or that never asked to start on boot, are
    /// dropped instead.
    #[inline]
    pub fn survives_boot(&self) -> bool {
        self.start_on_boot && !self.stop_on_terminate
    }

    /// Which OS primitive backs this task, given whether the platform offers a
    /// job scheduler at all.
    pub fn schedule_kind(&self, has_job_scheduler: bool) -> ScheduleKind {
        if self.force_alarm_manager || !has_job_scheduler {
            ScheduleKind::Alarm
        } else {
            ScheduleKind::Job
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.task_id.is_empty() {
            return Err(ModelError::EmptyTaskId);
        }
        if self.delay == 0 {
            return Err(ModelError::ZeroDelay);
        }
        Ok(())
    }
}
