use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Network constraint attached to a scheduled job.
///
/// When set to anything but [`NetworkType::None`], the OS never runs the job while
/// the constraint is unmet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum NetworkType {
    /// No network requirement.
    #[default]
    None = 0,
    /// Any connectivity.
    Any = 1,
    /// Unmetered connectivity only.
    Unmetered = 2,
    /// Connectivity that is not roaming.
    NotRoaming = 3,
    /// Cellular connectivity.
    Cellular = 4,
}

impl TryFrom<u8> for NetworkType {
    type Error = ModelError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(NetworkType::None),
            1 => Ok(NetworkType::Any),
            2 => Ok(NetworkType::Unmetered),
            3 => Ok(NetworkType::NotRoaming),
            4 => Ok(NetworkType::Cellular),
            other => Err(ModelError::InvalidNetworkType(other)),
        }
    }
}

impl From<NetworkType> for u8 {
    fn from(n: NetworkType) -> Self {
        n as u8
    }
}
