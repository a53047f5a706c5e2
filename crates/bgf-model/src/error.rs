use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("task id must not be empty")]
    EmptyTaskId,
    #[error("task delay must be greater than zero")]
    ZeroDelay,
    #[error("invalid network type: {0} (expected 0..=4)")]
    InvalidNetworkType(u8),
    #[error("invalid fetch status: {0} (expected 0..=2)")]
    InvalidStatus(u8),
}
