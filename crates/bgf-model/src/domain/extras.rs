use serde::{Deserialize, Serialize};

use crate::{EpochMillis, TaskId};

/// Metadata the OS job scheduler hands back with every job callback.
///
/// Written by the scheduler facade at schedule time, read back by the job dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobExtras {
    /// When the job was (re)scheduled, in epoch millis.
    pub scheduled_at: EpochMillis,
    /// Logical task the job belongs to.
    pub task_id: TaskId,
}

impl JobExtras {
    pub fn new(task_id: impl Into<TaskId>, scheduled_at: EpochMillis) -> Self {
        Self {
            scheduled_at,
            task_id: task_id.into(),
        }
    }

    /// Milliseconds elapsed between scheduling and `now`.
    ///
    /// Saturates at zero when the clock went backwards.
    #[inline]
    pub fn elapsed_since_schedule(&self, now: EpochMillis) -> u64 {
        now.saturating_sub(self.scheduled_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_field_names_are_snake_case() {
        let extras = JobExtras::new("sync", 1_700_000_000_000);
        let json = serde_json::to_value(&extras).unwrap();

        assert_eq!(json["scheduled_at"], 1_700_000_000_000u64);
        assert_eq!(json["task_id"], "sync");
    }

    #[test]
    fn elapsed_saturates_on_clock_skew() {
        let extras = JobExtras::new("sync", 5_000);
        assert_eq!(extras.elapsed_since_schedule(4_000), 0);
        assert_eq!(extras.elapsed_since_schedule(6_500), 1_500);
    }
}
