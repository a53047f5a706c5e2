use std::sync::{Arc, Mutex, PoisonError};

use bgf_model::TaskId;
use tracing::debug;
use uuid::Uuid;

use super::runtime::{RuntimeContext, RuntimeTaskId, TaskEventListener};

/// One headless invocation, registered as the context's task listener.
///
/// Detaches itself when the payload finishes; detaching twice is a no-op.
pub struct HeadlessTask {
    id: Uuid,
    task_id: TaskId,
    context: Mutex<Option<Arc<dyn RuntimeContext>>>,
}

impl HeadlessTask {
    pub fn new(task_id: TaskId) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            task_id,
            context: Mutex::new(None),
        })
    }

    #[inline]
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Register with `ctx` and remember it for later removal.
    pub fn attach(self: &Arc<Self>, ctx: &Arc<dyn RuntimeContext>) {
        let listener: Arc<dyn TaskEventListener> = self.clone();
        ctx.add_task_event_listener(listener);
        *self.context.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(ctx));
    }

    /// Remove this listener from its context.
    pub fn finish(&self) {
        let ctx = self
            .context
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(ctx) = ctx {
            ctx.remove_task_event_listener(self.id);
        }
    }

    pub fn is_attached(&self) -> bool {
        self.context
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl TaskEventListener for HeadlessTask {
    fn id(&self) -> Uuid {
        self.id
    }

    fn on_task_start(&self, task: RuntimeTaskId) {
        debug!(task_id = %self.task_id, runtime_task = task, "headless task started");
    }

    fn on_task_finish(&self, task: RuntimeTaskId) {
        debug!(task_id = %self.task_id, runtime_task = task, "headless task finished");
        self.finish();
    }
}
