//! The dispatch pipeline shared by every entry point.
//!
//! Job callbacks, alarm broadcasts and the fetch facade all funnel descriptors
//! through [`Dispatcher`]: it owns the [`TaskRegistry`], hands invocations to the
//! [`RuntimeBridge`] and settles descriptors through their completion handler.

mod alarm;
pub use alarm::AlarmDispatcher;

mod boot;
pub use boot::{BootReceiver, BootReconciler};

mod job;
pub use job::{JobDispatcher, JobParameters};

use std::sync::Arc;

use bgf_model::{DispatchEvent, EventKind, JobId, TaskId};
use tokio::runtime::Handle;
use tracing::{debug, info, instrument, warn};

use crate::{
    bridge::{OwnerThread, RuntimeBridge, RuntimeHost},
    clock::{Clock, SystemClock},
    config::DispatchConfig,
    error::CoreError,
    registry::TaskRegistry,
    subscriber::{EventBus, Subscribe},
    task::BgTask,
};

struct Inner {
    registry: TaskRegistry,
    bridge: RuntimeBridge,
    clock: Arc<dyn Clock>,
    config: DispatchConfig,
    bus: EventBus,
    handle: Handle,
}

/// Registers descriptors, invokes the runtime and settles descriptors exactly once.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    pub fn builder(config: DispatchConfig) -> DispatcherBuilder {
        DispatcherBuilder::new(config)
    }

    #[inline]
    pub fn registry(&self) -> &TaskRegistry {
        &self.inner.registry
    }

    #[inline]
    pub fn config(&self) -> &DispatchConfig {
        &self.inner.config
    }

    #[inline]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    #[inline]
    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    #[inline]
    pub fn handle(&self) -> &Handle {
        &self.inner.handle
    }

    #[inline]
    pub fn owner(&self) -> &OwnerThread {
        self.inner.bridge.owner()
    }

    pub(crate) fn publish(&self, event: DispatchEvent) {
        self.inner.bus.publish(event);
    }

    /// Register `task` and invoke the headless payload for it.
    ///
    /// A live descriptor with the same id is superseded, not finished. If the
    /// bridge abandons the invocation the descriptor is completed right away.
    #[instrument(level = "debug", skip_all, fields(task_id = %task.task_id(), job = %task.job_id()))]
    pub fn dispatch(&self, task: Arc<BgTask>) {
        if let Some(prev) = self.inner.registry.register(Arc::clone(&task)) {
            debug!(prev_job = %prev.job_id(), "superseding live descriptor");
            self.publish(
                DispatchEvent::new(EventKind::TaskSuperseded)
                    .with_task(prev.task_id())
                    .with_job(prev.job_id()),
            );
        }
        self.publish(
            DispatchEvent::new(EventKind::TaskRegistered)
                .with_task(task.task_id())
                .with_job(task.job_id()),
        );
        self.invoke(task);
    }

    fn invoke(&self, task: Arc<BgTask>) {
        let invocation = self.inner.bridge.invoke(task.event());
        let me = self.clone();
        let window = task.max_execution();

        self.inner.handle.spawn(async move {
            match tokio::time::timeout(window, invocation.outcome()).await {
                Ok(Ok(runtime_task)) if task.is_finished() => {
                    debug!(task_id = %task.task_id(), runtime_task, "payload started for a settled task");
                }
                Ok(Ok(runtime_task)) => {
                    debug!(task_id = %task.task_id(), runtime_task, "payload started");
                    me.publish(
                        DispatchEvent::new(EventKind::TaskInvoked)
                            .with_task(task.task_id())
                            .with_job(task.job_id()),
                    );
                }
                Ok(Err(err)) => me.abandon(&task, &err),
                Err(_) => {
                    debug!(task_id = %task.task_id(), "runtime never became ready within the execution window");
                }
            }
        });
    }

    fn abandon(&self, task: &Arc<BgTask>, err: &CoreError) {
        warn!(task_id = %task.task_id(), error = %err, "invocation abandoned; completing task");
        if let Some(kind) = err.event_kind() {
            self.publish(
                DispatchEvent::new(kind)
                    .with_task(task.task_id())
                    .with_job(task.job_id())
                    .with_reason(err.to_string()),
            );
        }
        self.complete(task);
    }

    /// Payload-reported completion. Returns `false` if no live descriptor exists.
    #[instrument(level = "debug", skip(self))]
    pub fn finish(&self, task_id: &TaskId) -> bool {
        match self.inner.registry.lookup(task_id) {
            Some(task) => self.complete(&task),
            None => {
                debug!("finish for a task that is not in flight");
                false
            }
        }
    }

    /// OS-reported (or watchdog) timeout for `task_id`.
    ///
    /// When `job` is given, a live descriptor carrying a different job handle is
    /// left alone: the signal belongs to an execution that was superseded.
    #[instrument(level = "debug", skip(self))]
    pub fn timeout(&self, task_id: &TaskId, job: Option<JobId>) -> bool {
        let task = self
            .inner
            .registry
            .lookup(task_id)
            .filter(|t| job.is_none_or(|j| t.job_id() == j));

        match task {
            Some(task) => self.timeout_task(&task),
            None => {
                debug!("timeout for a task that is not in flight");
                let mut ev = DispatchEvent::new(EventKind::StopUnknownTask).with_task(task_id);
                if let Some(job) = job {
                    ev = ev.with_job(job);
                }
                self.publish(ev);
                false
            }
        }
    }

    /// Mark `task` timed out, tell the payload, then settle the descriptor.
    pub(crate) fn timeout_task(&self, task: &Arc<BgTask>) -> bool {
        if !task.mark_timed_out() {
            return false;
        }
        warn!(task_id = %task.task_id(), job = %task.job_id(), "task exceeded its execution window");
        self.publish(
            DispatchEvent::new(EventKind::TaskTimedOut)
                .with_task(task.task_id())
                .with_job(task.job_id()),
        );

        if self.inner.registry.is_current(task) {
            let invocation = self.inner.bridge.invoke(task.event());
            let task_id = task.task_id().clone();
            self.inner.handle.spawn(async move {
                if let Err(err) = invocation.outcome().await {
                    debug!(%task_id, error = %err, "timeout event not delivered");
                }
            });
        }
        self.complete(task);
        true
    }

    fn complete(&self, task: &Arc<BgTask>) -> bool {
        if !task.finish() {
            return false;
        }
        self.inner.registry.remove_if_current(task);
        info!(task_id = %task.task_id(), timed_out = task.timed_out(), "task finished");
        self.publish(
            DispatchEvent::new(EventKind::TaskFinished)
                .with_task(task.task_id())
                .with_job(task.job_id()),
        );
        true
    }
}

pub struct DispatcherBuilder {
    config: DispatchConfig,
    host: Option<Arc<dyn RuntimeHost>>,
    clock: Arc<dyn Clock>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    handle: Option<Handle>,
}

impl DispatcherBuilder {
    fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            host: None,
            clock: Arc::new(SystemClock),
            subscribers: Vec::new(),
            handle: None,
        }
    }

    pub fn with_host(mut self, host: Arc<dyn RuntimeHost>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Runtime that drives invocation watchers; defaults to the current one.
    pub fn with_handle(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Spawns the owner thread and assembles the pipeline.
    pub fn build(self) -> Result<Dispatcher, CoreError> {
        let handle = match self.handle {
            Some(h) => h,
            None => Handle::try_current().map_err(|_| CoreError::NoExecutor)?,
        };
        let host = self.host.ok_or_else(|| {
            CoreError::HostMisconfigured("no runtime host configured".to_string())
        })?;
        let owner = OwnerThread::spawn(&self.config.owner_thread_name)?;
        let bridge = RuntimeBridge::new(host, owner, &self.config);

        info!(owner = bridge.owner().name(), subscribers = self.subscribers.len(), "dispatcher ready");
        Ok(Dispatcher {
            inner: Arc::new(Inner {
                registry: TaskRegistry::new(),
                bridge,
                clock: self.clock,
                config: self.config,
                bus: EventBus::new(self.subscribers),
                handle,
            }),
        })
    }
}
