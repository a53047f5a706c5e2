/// Task id of the default periodic fetch task.
pub const FETCH_TASK_ID: &str = "react-native-background-fetch";

/// Name under which the headless payload is registered in the runtime.
pub const HEADLESS_TASK_NAME: &str = "BackgroundFetch";

/// Job metadata key holding the logical task id.
pub const FIELD_TASK_ID: &str = "task_id";

/// Job metadata key holding the schedule timestamp.
pub const FIELD_SCHEDULED_AT: &str = "scheduled_at";

/// The OS never runs periodic jobs more often than every 15 minutes.
pub const MIN_FETCH_INTERVAL_MS: u64 = 15 * 60 * 1000;
