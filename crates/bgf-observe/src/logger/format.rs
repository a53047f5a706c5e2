use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::logger::error::LoggerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerFormat {
    Text,
    Json,
    Journald,
}

impl FromStr for LoggerFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase();
        match norm.as_str() {
            "text" => Ok(LoggerFormat::Text),
            "json" => Ok(LoggerFormat::Json),
            "journald" | "journal" => {
                #[cfg(all(target_os = "linux", feature = "journald"))]
                {
                    Ok(LoggerFormat::Journald)
                }

                #[cfg(not(all(target_os = "linux", feature = "journald")))]
                {
                    Err(LoggerError::JournaldNotSupported)
                }
            }
            _ => Err(LoggerError::InvalidFormat(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for LoggerFormat {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
