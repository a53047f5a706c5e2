//! Single designated thread the runtime requires invocations on.

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
    thread::{self, ThreadId},
    time::Duration,
};

use tokio::sync::mpsc;
use tracing::{error, trace};

use crate::error::CoreError;

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    RunAfter(Duration, Job),
}

/// Marshals closures onto one dedicated thread.
///
/// The thread runs a current-thread tokio runtime, so delayed jobs are timers on
/// that same thread and never run anywhere else. The thread exits once every
/// handle is dropped.
#[derive(Clone)]
pub struct OwnerThread {
    tx: mpsc::UnboundedSender<Message>,
    thread: ThreadId,
    name: Arc<str>,
}

impl OwnerThread {
    pub fn spawn(name: &str) -> Result<Self, CoreError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| CoreError::OwnerSpawn(e.to_string()))?;

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                rt.block_on(async move {
                    while let Some(msg) = rx.recv().await {
                        match msg {
                            Message::Run(job) => run_guarded(job),
                            Message::RunAfter(delay, job) => {
                                tokio::spawn(async move {
                                    tokio::time::sleep(delay).await;
                                    run_guarded(job);
                                });
                            }
                        }
                    }
                    trace!("owner thread drained");
                });
            })
            .map_err(|e| CoreError::OwnerSpawn(e.to_string()))?;

        Ok(Self {
            tx,
            thread: handle.thread().id(),
            name: Arc::from(name),
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue `job` to run on the owner thread.
    pub fn post(&self, job: impl FnOnce() + Send + 'static) -> Result<(), CoreError> {
        self.tx
            .send(Message::Run(Box::new(job)))
            .map_err(|_| CoreError::OwnerGone)
    }

    /// Queue `job` to run on the owner thread after `delay`.
    pub fn post_delayed(
        &self,
        delay: Duration,
        job: impl FnOnce() + Send + 'static,
    ) -> Result<(), CoreError> {
        self.tx
            .send(Message::RunAfter(delay, Box::new(job)))
            .map_err(|_| CoreError::OwnerGone)
    }

    #[inline]
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread
    }

    pub fn assert_current(&self) -> Result<(), CoreError> {
        if self.is_current() {
            Ok(())
        } else {
            Err(CoreError::WrongThread)
        }
    }
}

fn run_guarded(job: Job) {
    if catch_unwind(AssertUnwindSafe(job)).is_err() {
        error!("job panicked on the owner thread");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc as std_mpsc;
    use std::time::Instant;

    #[test]
    fn posted_jobs_run_on_owner_thread_in_order() {
        let owner = OwnerThread::spawn("test-owner").unwrap();
        let (tx, rx) = std_mpsc::channel();

        for i in 0..3 {
            let tx = tx.clone();
            let check = owner.clone();
            owner
                .post(move || {
                    let name = thread::current().name().map(str::to_string);
                    tx.send((i, check.is_current(), name)).unwrap();
                })
                .unwrap();
        }

        for i in 0..3 {
            let (seen, on_owner, name) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
            assert_eq!(seen, i);
            assert!(on_owner);
            assert_eq!(name.as_deref(), Some("test-owner"));
        }
        assert!(!owner.is_current());
        assert_eq!(owner.assert_current(), Err(CoreError::WrongThread));
    }

    #[test]
    fn delayed_job_waits() {
        let owner = OwnerThread::spawn("test-owner-delay").unwrap();
        let (tx, rx) = std_mpsc::channel();
        let start = Instant::now();

        owner
            .post_delayed(Duration::from_millis(50), move || {
                tx.send(start.elapsed()).unwrap();
            })
            .unwrap();

        let elapsed = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(elapsed >= Duration::from_millis(50));
    }

    #[test]
    fn panicking_job_does_not_kill_thread() {
        let owner = OwnerThread::spawn("test-owner-panic").unwrap();
        let (tx, rx) = std_mpsc::channel();

        owner.post(|| panic!("boom")).unwrap();
        owner.post(move || tx.send(()).unwrap()).unwrap();

        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
    }
}
