use std::time::{SystemTime, UNIX_EPOCH};

use bgf_model::EpochMillis;

/// Wall-clock source for schedule timestamps.
pub trait Clock: Send + Sync + 'static {
    fn now_millis(&self) -> EpochMillis;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> EpochMillis {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as EpochMillis)
            .unwrap_or(0)
    }
}
