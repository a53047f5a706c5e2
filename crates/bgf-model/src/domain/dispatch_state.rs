use serde::{Deserialize, Serialize};

/// Lifecycle of one job-scheduler callback.
///
/// `Idle → Running → {Completed, StoppedByOs}`; a spurious fire goes straight
/// from `Idle` to `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DispatchState {
    Idle,
    Running,
    Completed,
    StoppedByOs,
}

impl DispatchState {
    /// Returns `true` once the OS has been told the job is done.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DispatchState::Completed | DispatchState::StoppedByOs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(DispatchState::Completed.is_terminal());
        assert!(DispatchState::StoppedByOs.is_terminal());

        assert!(!DispatchState::Idle.is_terminal());
        assert!(!DispatchState::Running.is_terminal());
    }
}
