use std::time::SystemTime;

use crate::{JobId, TaskId};

/// Kind of a dispatch lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // scheduling
    TaskScheduled,
    TaskStopped,
    BootReconciled,

    // dispatch
    TaskRegistered,
    TaskSuperseded,
    SpuriousFireIgnored,
    TaskInvoked,
    TaskFinished,
    TaskTimedOut,
    StopUnknownTask,

    // abandoned invocations
    HostMisconfigured,
    ForegroundConflict,
    BackgroundDisallowed,

    // wake-lock
    WakeLockAcquired,
    WakeLockReleased,
}

/// One observable transition of the dispatch subsystem.
#[derive(Debug, Clone)]
pub struct DispatchEvent {
    pub kind: EventKind,
    pub task: Option<TaskId>,
    pub job: Option<JobId>,
    pub reason: Option<String>,
    pub at: SystemTime,
}

impl DispatchEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            task: None,
            job: None,
            reason: None,
            at: SystemTime::now(),
        }
    }

    pub fn with_task(mut self, task: &TaskId) -> Self {
        self.task = Some(task.clone());
        self
    }

    /// Attaches the OS job handle; the alarm sentinel is left out.
    pub fn with_job(mut self, job: JobId) -> Self {
        if !job.is_none() {
            self.job = Some(job);
        }
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
