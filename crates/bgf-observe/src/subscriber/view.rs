use std::borrow::Borrow;

use bgf_model::{DispatchEvent, EventKind};
use tracing::{debug, error, info, trace, warn};

pub trait View {
    fn as_task(&self) -> &str;
    fn as_reason(&self) -> &str;
    fn job(&self) -> i32;
    fn kind(&self) -> EventKind;
}

impl<T> View for T
where
    T: Borrow<DispatchEvent>,
{
    #[inline]
    fn as_task(&self) -> &str {
        self.borrow()
            .task
            .as_ref()
            .map(|t| t.as_str())
            .unwrap_or("unknown")
    }
    #[inline]
    fn as_reason(&self) -> &str {
        self.borrow().reason.as_deref().unwrap_or("unknown")
    }
    #[inline]
    fn job(&self) -> i32 {
        self.borrow().job.map(|j| j.get()).unwrap_or(0)
    }
    #[inline]
    fn kind(&self) -> EventKind {
        self.borrow().kind
    }
}

#[inline]
pub fn message_for(kind: EventKind) -> &'static str {
    match kind {
        // scheduling
        EventKind::TaskScheduled => "task scheduled with the OS",
        EventKind::TaskStopped => "task schedule cancelled",
        EventKind::BootReconciled => "schedules reconciled after reboot",

        // dispatch
        EventKind::TaskRegistered => "task registered for execution",
        EventKind::TaskSuperseded => "live task superseded by a newer execution",
        EventKind::SpuriousFireIgnored => "job fired right after scheduling; ignored",
        EventKind::TaskInvoked => "headless payload invoked",
        EventKind::TaskFinished => "task finished",
        EventKind::TaskTimedOut => "task exceeded its execution window",
        EventKind::StopUnknownTask => "stop or timeout for a task that is not in flight",

        // abandoned
        EventKind::HostMisconfigured => "host cannot supply a runtime; task ignored",
        EventKind::ForegroundConflict => "runtime is in the foreground; task ignored",
        EventKind::BackgroundDisallowed => "background execution disallowed; task ignored",

        // wake-lock
        EventKind::WakeLockAcquired => "wake-lock acquired",
        EventKind::WakeLockReleased => "wake-lock released",
    }
}

#[inline]
pub fn log_event<E: View>(e: E) {
    let msg = message_for(e.kind());

    match e.kind() {
        // scheduling
        EventKind::TaskScheduled => info!(task = e.as_task(), kind = e.as_reason(), "{msg}"),
        EventKind::TaskStopped => info!(task = e.as_task(), "{msg}"),
        EventKind::BootReconciled => info!(summary = e.as_reason(), "{msg}"),

        // dispatch
        EventKind::TaskRegistered => debug!(task = e.as_task(), job = e.job(), "{msg}"),
        EventKind::TaskSuperseded => debug!(task = e.as_task(), job = e.job(), "{msg}"),
        EventKind::SpuriousFireIgnored => {
            debug!(task = e.as_task(), job = e.job(), reason = e.as_reason(), "{msg}")
        }
        EventKind::TaskInvoked => info!(task = e.as_task(), job = e.job(), "{msg}"),
        EventKind::TaskFinished => info!(task = e.as_task(), job = e.job(), "{msg}"),
        EventKind::TaskTimedOut => warn!(task = e.as_task(), job = e.job(), "{msg}"),
        EventKind::StopUnknownTask => debug!(task = e.as_task(), job = e.job(), "{msg}"),

        // abandoned
        EventKind::HostMisconfigured => {
            error!(task = e.as_task(), reason = e.as_reason(), "{msg}")
        }
        EventKind::ForegroundConflict => warn!(task = e.as_task(), "{msg}"),
        EventKind::BackgroundDisallowed => {
            error!(task = e.as_task(), reason = e.as_reason(), "{msg}")
        }

        // wake-lock
        EventKind::WakeLockAcquired => trace!(task = e.as_task(), tag = e.as_reason(), "{msg}"),
        EventKind::WakeLockReleased => trace!(task = e.as_task(), tag = e.as_reason(), "{msg}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bgf_model::{JobId, TaskId};

    #[test]
    fn view_falls_back_for_missing_fields() {
        let ev = DispatchEvent::new(EventKind::BootReconciled);
        assert_eq!(ev.as_task(), "unknown");
        assert_eq!(ev.as_reason(), "unknown");
        assert_eq!(ev.job(), 0);
    }

    #[test]
    fn view_reads_populated_fields() {
        let ev = DispatchEvent::new(EventKind::TaskTimedOut)
            .with_task(&TaskId::from("sync"))
            .with_job(JobId::new(7))
            .with_reason("stopped by OS");
        assert_eq!(ev.as_task(), "sync");
        assert_eq!(ev.job(), 7);
        assert_eq!(ev.as_reason(), "stopped by OS");
        assert_eq!((&ev).kind(), EventKind::TaskTimedOut);
    }
}
