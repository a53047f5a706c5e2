use serde::{Deserialize, Serialize};

use crate::TaskId;

/// Event delivered to the headless payload inside the runtime.
///
/// When `timeout` is set the payload's time is up: it must stop and report
/// completion for `task_id` right away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadlessEvent {
    pub task_id: TaskId,
    pub timeout: bool,
}

impl HeadlessEvent {
    pub fn new(task_id: TaskId, timeout: bool) -> Self {
        Self { task_id, timeout }
    }
}
