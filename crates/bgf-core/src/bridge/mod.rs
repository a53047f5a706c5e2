//! Runtime Bridge: makes sure the runtime is live and invokes the headless payload
//! on its owner thread.
//!
//! Protocol, all on the owner thread:
//! 1. no runtime from the host → abandon (host misconfiguration);
//! 2. no context yet → subscribe a single-use ready listener, start creating the
//!    context unless creation already began, invoke `grace_delay` after ready;
//! 3. context present → invoke right away;
//! 4. context in the foreground → abandon without registering anything;
//! 5. invocation registers a [`HeadlessTask`] listener and starts the payload; a
//!    runtime rejection is reported as disallowed background execution.

mod headless;
pub use headless::HeadlessTask;

mod owner;
pub use owner::OwnerThread;

mod ready;
pub use ready::{ReadyListener, ReadySignal};

mod runtime;
pub use runtime::{
    ContextListener, HeadlessTaskConfig, Lifecycle, Runtime, RuntimeContext, RuntimeHost,
    RuntimeTaskId, StartTaskError, TaskEventListener,
};

use std::{sync::Arc, time::Duration};

use bgf_model::HeadlessEvent;
use tokio::sync::oneshot;
use tracing::{debug, error, instrument, warn};

use crate::{config::DispatchConfig, error::CoreError};

type Reply = oneshot::Sender<Result<RuntimeTaskId, CoreError>>;

/// Pending result of one bridge invocation.
pub struct Invocation {
    rx: oneshot::Receiver<Result<RuntimeTaskId, CoreError>>,
}

impl Invocation {
    fn failed(err: CoreError) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Err(err));
        Self { rx }
    }

    /// The runtime task id, or why the invocation was abandoned.
    ///
    /// Never resolves while the runtime context is still being created.
    pub async fn outcome(self) -> Result<RuntimeTaskId, CoreError> {
        self.rx.await.unwrap_or(Err(CoreError::OwnerGone))
    }
}

#[derive(Debug, Clone)]
struct BridgeConfig {
    task_name: String,
    task_timeout: Duration,
    grace_delay: Duration,
}

#[derive(Clone)]
pub struct RuntimeBridge {
    host: Arc<dyn RuntimeHost>,
    owner: OwnerThread,
    config: Arc<BridgeConfig>,
}

impl RuntimeBridge {
    pub fn new(host: Arc<dyn RuntimeHost>, owner: OwnerThread, config: &DispatchConfig) -> Self {
        Self {
            host,
            owner,
            config: Arc::new(BridgeConfig {
                task_name: config.headless_task_name.clone(),
                task_timeout: config.headless_timeout(),
                grace_delay: config.grace_delay(),
            }),
        }
    }

    #[inline]
    pub fn owner(&self) -> &OwnerThread {
        &self.owner
    }

    /// Invoke the headless payload with `event`.
    #[instrument(level = "debug", skip(self, event), fields(task_id = %event.task_id, timeout = event.timeout))]
    pub fn invoke(&self, event: HeadlessEvent) -> Invocation {
        let Some(runtime) = self.host.runtime() else {
            error!("failed to obtain a runtime from the host; task ignored");
            return Invocation::failed(CoreError::HostMisconfigured(
                "host did not supply a runtime".to_string(),
            ));
        };

        let (tx, rx) = oneshot::channel();
        let config = HeadlessTaskConfig::new(&self.config.task_name, event, self.config.task_timeout);
        let bridge = self.clone();
        if self
            .owner
            .post(move || bridge.start_task(runtime, config, tx))
            .is_err()
        {
            warn!(owner = self.owner.name(), "owner thread is gone; task ignored");
        }
        Invocation { rx }
    }

    fn start_task(&self, runtime: Arc<dyn Runtime>, config: HeadlessTaskConfig, reply: Reply) {
        if let Err(e) = self.owner.assert_current() {
            let _ = reply.send(Err(e));
            return;
        }

        if let Some(ctx) = runtime.current_context() {
            self.invoke_start_task(ctx, config, reply);
            return;
        }

        debug!("runtime context not ready; deferring invocation");
        let bridge = self.clone();
        runtime.on_context_ready(ReadyListener::new(move |ctx: Arc<dyn RuntimeContext>| {
            // The context may report ready before it accepts task registration.
            let grace = bridge.config.grace_delay;
            let owner = bridge.owner.clone();
            if owner
                .post_delayed(grace, move || bridge.invoke_start_task(ctx, config, reply))
                .is_err()
            {
                warn!("owner thread is gone; deferred task ignored");
            }
        }));

        if !runtime.has_started_creating_context() {
            runtime.create_context_in_background();
        }
    }

    fn invoke_start_task(
        &self,
        ctx: Arc<dyn RuntimeContext>,
        config: HeadlessTaskConfig,
        reply: Reply,
    ) {
        if ctx.lifecycle() == Lifecycle::Resumed {
            warn!(task_id = %config.event.task_id, "runtime is in the foreground; background task ignored");
            let _ = reply.send(Err(CoreError::ForegroundConflict));
            return;
        }

        let task = HeadlessTask::new(config.event.task_id.clone());
        task.attach(&ctx);

        match ctx.start_task(config) {
            Ok(id) => {
                debug!(task_id = %task.task_id(), runtime_task = id, "headless task invoked");
                let _ = reply.send(Ok(id));
            }
            Err(e) => {
                error!(task_id = %task.task_id(), error = %e, "headless task attempted to run in the foreground; task ignored");
                task.finish();
                let _ = reply.send(Err(CoreError::BackgroundDisallowed(e.to_string())));
            }
        }
    }
}
