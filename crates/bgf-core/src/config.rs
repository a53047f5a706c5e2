use std::time::Duration;

use bgf_model::{HEADLESS_TASK_NAME, TimeoutMs};
use serde::Deserialize;

/// Tunables of the dispatch subsystem.
///
/// Durations are kept in milliseconds so the config can be read straight from the
/// same JSON/TOML the host already carries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Upper bound on a single execution window (`MAX_TIME`).
    pub max_execution_ms: TimeoutMs,
    /// Slack added to the alarm wake-lock bound on top of `max_execution_ms`.
    pub wake_lock_buffer_ms: TimeoutMs,
    /// Job callbacks arriving sooner than this after scheduling are spurious.
    pub spurious_window_ms: TimeoutMs,
    /// Delay between "context ready" and the first invocation on a fresh runtime.
    pub grace_delay_ms: TimeoutMs,
    /// Execution budget handed to the headless payload.
    pub headless_timeout_ms: TimeoutMs,
    pub headless_task_name: String,
    pub wake_lock_tag: String,
    /// Force a timeout on alarm-path tasks still live after `max_execution_ms`.
    pub alarm_watchdog: bool,
    /// Name of the thread the runtime requires invocations on.
    pub owner_thread_name: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_execution_ms: 25_000,
            wake_lock_buffer_ms: 4_000,
            spurious_window_ms: 1_000,
            grace_delay_ms: 500,
            headless_timeout_ms: 30_000,
            headless_task_name: HEADLESS_TASK_NAME.to_string(),
            wake_lock_tag: "TSBackgroundFetch".to_string(),
            alarm_watchdog: true,
            owner_thread_name: "bgf-owner".to_string(),
        }
    }
}

impl DispatchConfig {
    pub fn with_max_execution_ms(mut self, ms: TimeoutMs) -> Self {
        self.max_execution_ms = ms;
        self
    }

    pub fn with_grace_delay_ms(mut self, ms: TimeoutMs) -> Self {
        self.grace_delay_ms = ms;
        self
    }

    pub fn with_headless_timeout_ms(mut self, ms: TimeoutMs) -> Self {
        self.headless_timeout_ms = ms;
        self
    }

    pub fn with_alarm_watchdog(mut self, enabled: bool) -> Self {
        self.alarm_watchdog = enabled;
        self
    }

    #[inline]
    pub fn max_execution(&self) -> Duration {
        Duration::from_millis(self.max_execution_ms)
    }

    /// How long an alarm-path wake-lock may be held before it self-expires.
    #[inline]
    pub fn wake_lock_bound(&self) -> Duration {
        Duration::from_millis(self.max_execution_ms.saturating_add(self.wake_lock_buffer_ms))
    }

    #[inline]
    pub fn grace_delay(&self) -> Duration {
        Duration::from_millis(self.grace_delay_ms)
    }

    #[inline]
    pub fn headless_timeout(&self) -> Duration {
        Duration::from_millis(self.headless_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_platform_limits() {
        let cfg = DispatchConfig::default();
        assert_eq!(cfg.max_execution(), Duration::from_secs(25));
        assert_eq!(cfg.wake_lock_bound(), Duration::from_secs(29));
        assert_eq!(cfg.headless_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.spurious_window_ms, 1_000);
        assert_eq!(cfg.headless_task_name, "BackgroundFetch");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: DispatchConfig =
            serde_json::from_str(r#"{"max_execution_ms": 10000, "alarm_watchdog": false}"#)
                .unwrap();
        assert_eq!(cfg.max_execution_ms, 10_000);
        assert!(!cfg.alarm_watchdog);
        assert_eq!(cfg.grace_delay_ms, 500);
        assert_eq!(cfg.wake_lock_bound(), Duration::from_millis(14_000));
    }

    #[test]
    fn oversized_bound_saturates() {
        let cfg: DispatchConfig =
            serde_json::from_str(&format!(r#"{{"max_execution_ms": {}}}"#, u64::MAX)).unwrap();
        assert_eq!(cfg.wake_lock_bound(), Duration::from_millis(u64::MAX));
    }
}
