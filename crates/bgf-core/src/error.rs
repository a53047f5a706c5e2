use bgf_model::{EventKind, ModelError, TaskId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("host cannot supply a runtime: {0}")]
    HostMisconfigured(String),
    #[error("runtime is in the foreground; background task skipped")]
    ForegroundConflict,
    #[error("background execution disallowed: {0}")]
    BackgroundDisallowed(String),
    #[error("called off the owner thread")]
    WrongThread,
    #[error("owner thread is gone")]
    OwnerGone,
    #[error("no tokio runtime to drive dispatch timers")]
    NoExecutor,
    #[error("failed to start owner thread: {0}")]
    OwnerSpawn(String),
    #[error("unknown task: {0}")]
    UnknownTask(TaskId),
    #[error("invalid task config: {0}")]
    InvalidConfig(#[from] ModelError),
    #[error("scheduler rejected request: {0}")]
    Scheduler(String),
}

impl CoreError {
    /// Event reported when an invocation is abandoned for this reason.
    pub fn event_kind(&self) -> Option<EventKind> {
        match self {
            CoreError::HostMisconfigured(_) => Some(EventKind::HostMisconfigured),
            CoreError::ForegroundConflict => Some(EventKind::ForegroundConflict),
            CoreError::BackgroundDisallowed(_) => Some(EventKind::BackgroundDisallowed),
            CoreError::UnknownTask(_) => Some(EventKind::StopUnknownTask),
            _ => None,
        }
    }
}
