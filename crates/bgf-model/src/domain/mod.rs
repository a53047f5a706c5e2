mod task_id;
pub use task_id::TaskId;

mod job_id;
pub use job_id::JobId;

mod extras;
pub use extras::JobExtras;

mod headless;
pub use headless::HeadlessEvent;

mod fetch_status;
pub use fetch_status::FetchStatus;

mod dispatch_state;
pub use dispatch_state::DispatchState;

mod constants;
pub use constants::{
    FETCH_TASK_ID, FIELD_SCHEDULED_AT, FIELD_TASK_ID, HEADLESS_TASK_NAME, MIN_FETCH_INTERVAL_MS,
};

/// Milliseconds since the Unix epoch.
///
/// OS job metadata carries timestamps in this form, so the core keeps them as-is.
pub type EpochMillis = u64;

/// Timeout value in milliseconds.
pub type TimeoutMs = u64;
