use std::fmt;

use serde::{Deserialize, Serialize};

/// Handle assigned by the OS job scheduler.
///
/// Opaque to the core; only used to correlate stop signals and completion.
/// [`JobId::NONE`] marks work that did not come from the job scheduler (alarm path).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(i32);

impl JobId {
    /// Sentinel: "no OS job handle".
    pub const NONE: JobId = JobId(0);

    #[inline]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn get(self) -> i32 {
        self.0
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for JobId {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}
