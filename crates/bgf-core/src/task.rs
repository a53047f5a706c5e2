use std::{
    fmt,
    sync::atomic::{AtomicU8, Ordering},
    time::Duration,
};

use bgf_model::{EpochMillis, HeadlessEvent, JobId, TaskId};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::completion::{Completion, CompletionHandler};

const TIMED_OUT: u8 = 0b01;
const FINISHED: u8 = 0b10;

/// Identity and timing metadata for one scheduled execution.
///
/// A descriptor settles exactly once: it may time out before it finishes, never
/// after, and its completion handler runs on the first `finish` only.
pub struct BgTask {
    task_id: TaskId,
    job_id: JobId,
    scheduled_at: EpochMillis,
    max_execution: Duration,
    flags: AtomicU8,
    completion: Completion,
    done: CancellationToken,
}

impl BgTask {
    pub fn new(
        task_id: TaskId,
        job_id: JobId,
        scheduled_at: EpochMillis,
        max_execution: Duration,
        completion: impl CompletionHandler,
    ) -> Self {
        Self {
            task_id,
            job_id,
            scheduled_at,
            max_execution,
            flags: AtomicU8::new(0),
            completion: Completion::new(completion),
            done: CancellationToken::new(),
        }
    }

    #[inline]
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    #[inline]
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    #[inline]
    pub fn scheduled_at(&self) -> EpochMillis {
        self.scheduled_at
    }

    #[inline]
    pub fn max_execution(&self) -> Duration {
        self.max_execution
    }

    #[inline]
    pub fn timed_out(&self) -> bool {
        self.flags.load(Ordering::Acquire) & TIMED_OUT != 0
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.flags.load(Ordering::Acquire) & FINISHED != 0
    }

    /// Flips `timed_out` to `true`.
    ///
    /// Returns `false` if the task already timed out or already finished.
    pub fn mark_timed_out(&self) -> bool {
        self.flags
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |f| {
                (f == 0).then_some(TIMED_OUT)
            })
            .is_ok()
    }

    /// Runs the completion handler; returns `false` on every call after the first.
    pub fn finish(&self) -> bool {
        let prev = self.flags.fetch_or(FINISHED, Ordering::AcqRel);
        if prev & FINISHED != 0 {
            return false;
        }
        self.completion.complete();
        self.done.cancel();
        true
    }

    /// Resolves once [`BgTask::finish`] has run.
    pub fn finished(&self) -> WaitForCancellationFuture<'_> {
        self.done.cancelled()
    }

    /// Event handed to the headless payload for this execution.
    pub fn event(&self) -> HeadlessEvent {
        HeadlessEvent::new(self.task_id.clone(), self.timed_out())
    }
}

impl fmt::Debug for BgTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BgTask")
            .field("task_id", &self.task_id)
            .field("job_id", &self.job_id)
            .field("scheduled_at", &self.scheduled_at)
            .field("timed_out", &self.timed_out())
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::FnCompletion;
    use std::sync::{Arc, atomic::AtomicUsize};

    fn counted(task_id: &str) -> (BgTask, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let task = BgTask::new(
            TaskId::from(task_id),
            JobId::new(7),
            1_000,
            Duration::from_secs(25),
            FnCompletion::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (task, calls)
    }

    #[test]
    fn timed_out_transitions_once() {
        let (task, _) = counted("t");
        assert!(!task.timed_out());
        assert!(task.mark_timed_out());
        assert!(!task.mark_timed_out());
        assert!(task.timed_out());
        assert!(task.event().timeout);
    }

    #[test]
    fn finish_after_timeout_still_completes() {
        let (task, calls) = counted("t");
        assert!(task.mark_timed_out());
        assert!(task.finish());
        assert!(task.timed_out());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn timeout_after_finish_is_noop() {
        let (task, calls) = counted("t");
        assert!(task.finish());
        assert!(!task.mark_timed_out());
        assert!(!task.timed_out());
        assert!(!task.finish());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn event_carries_task_id() {
        let (task, _) = counted("com.example.sync");
        let event = task.event();
        assert_eq!(event.task_id, TaskId::from("com.example.sync"));
        assert!(!event.timeout);
    }

    #[tokio::test]
    async fn finished_future_resolves_on_finish() {
        let (task, _) = counted("t");
        let task = Arc::new(task);
        let waiter = {
            let task = Arc::clone(&task);
            tokio::spawn(async move { task.finished().await })
        };
        task.finish();
        waiter.await.unwrap();
    }
}
