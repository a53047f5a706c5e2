//! Seams onto the managed application runtime.

use std::{sync::Arc, time::Duration};

use bgf_model::HeadlessEvent;
use thiserror::Error;
use uuid::Uuid;

use super::ready::ReadyListener;

/// Runtime-assigned id of a started headless task.
pub type RuntimeTaskId = u32;

/// Listener waiting for the runtime's execution context.
pub type ContextListener = ReadyListener<Arc<dyn RuntimeContext>>;

/// Lifecycle state of a runtime context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    BeforeCreate,
    BeforeResume,
    /// The user-facing runtime is in the foreground.
    Resumed,
}

/// Everything the runtime needs to start a headless task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessTaskConfig {
    pub task_name: String,
    pub event: HeadlessEvent,
    pub timeout: Duration,
    pub allowed_in_foreground: bool,
}

impl HeadlessTaskConfig {
    pub fn new(task_name: impl Into<String>, event: HeadlessEvent, timeout: Duration) -> Self {
        Self {
            task_name: task_name.into(),
            event,
            timeout,
            allowed_in_foreground: false,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StartTaskError {
    #[error("headless task attempted to run in the foreground")]
    Foreground,
    #[error("runtime rejected headless task: {0}")]
    Rejected(String),
}

/// Receives start/finish signals for headless tasks.
pub trait TaskEventListener: Send + Sync {
    /// Identity used for deregistration.
    fn id(&self) -> Uuid;
    fn on_task_start(&self, task: RuntimeTaskId);
    fn on_task_finish(&self, task: RuntimeTaskId);
}

/// The process hosting the runtime.
pub trait RuntimeHost: Send + Sync + 'static {
    /// `None` when the host cannot supply a runtime (misconfigured embedding).
    fn runtime(&self) -> Option<Arc<dyn Runtime>>;
}

/// The single logical runtime instance.
pub trait Runtime: Send + Sync {
    fn current_context(&self) -> Option<Arc<dyn RuntimeContext>>;

    fn has_started_creating_context(&self) -> bool;

    /// Start building the execution context without blocking the caller.
    fn create_context_in_background(&self);

    /// Fire `listener` once the context is ready, immediately if it already is.
    ///
    /// [`ReadySignal`](super::ReadySignal) implements exactly this contract.
    fn on_context_ready(&self, listener: ContextListener);
}

/// A live execution context of the runtime.
///
/// Implementations must not hold internal locks while calling listeners; a
/// listener deregisters itself from inside `on_task_finish`.
pub trait RuntimeContext: Send + Sync {
    fn lifecycle(&self) -> Lifecycle;

    fn add_task_event_listener(&self, listener: Arc<dyn TaskEventListener>);

    fn remove_task_event_listener(&self, id: Uuid);

    fn start_task(&self, config: HeadlessTaskConfig) -> Result<RuntimeTaskId, StartTaskError>;
}
