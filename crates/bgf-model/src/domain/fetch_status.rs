use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Whether the OS currently lets the application run background work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FetchStatus {
    /// Unavailable and the user cannot enable it (e.g. parental controls).
    Restricted = 0,
    /// The user disabled background behavior for the app or the whole system.
    Denied = 1,
    /// Background fetch is available and enabled.
    Available = 2,
}

impl FetchStatus {
    #[inline]
    pub fn is_available(self) -> bool {
        matches!(self, FetchStatus::Available)
    }
}

impl TryFrom<u8> for FetchStatus {
    type Error = ModelError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(FetchStatus::Restricted),
            1 => Ok(FetchStatus::Denied),
            2 => Ok(FetchStatus::Available),
            other => Err(ModelError::InvalidStatus(other)),
        }
    }
}

impl From<FetchStatus> for u8 {
    fn from(status: FetchStatus) -> Self {
        status as u8
    }
}
