use std::{env::VarError, io::IsTerminal};

use serde::Deserialize;

use crate::logger::{error::LoggerError, format::LoggerFormat};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` directives, e.g. `info,bgf_core=debug`.
    pub level: String,
    pub with_targets: bool,
    /// Include thread names; invocations always run on the owner thread.
    pub with_threads: bool,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let use_color = cfg!(test) || std::io::stdout().is_terminal();
        Self {
            format: LoggerFormat::Text,
            level: "info".to_string(),
            with_targets: true,
            with_threads: true,
            use_color,
        }
    }
}

impl LoggerConfig {
    /// Defaults overridden by `BGF_LOG` (filter) and `BGF_LOG_FORMAT`.
    pub fn from_env() -> Result<Self, LoggerError> {
        let mut cfg = Self::default();
        if let Some(level) = var(LEVEL_VAR)? {
            cfg.level = level;
        }
        if let Some(format) = var(FORMAT_VAR)? {
            cfg.format = format.parse()?;
        }
        Ok(cfg)
    }
}

const LEVEL_VAR: &str = "BGF_LOG";
const FORMAT_VAR: &str = "BGF_LOG_FORMAT";

fn var(name: &'static str) -> Result<Option<String>, LoggerError> {
    match std::env::var(name) {
        Ok(v) => Ok(Some(v)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(LoggerError::InvalidEnv(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg: LoggerConfig = serde_json::from_str(r#"{ "format": "json", "level": "debug" }"#).unwrap();
        assert_eq!(cfg.format, LoggerFormat::Json);
        assert_eq!(cfg.level, "debug");
        assert!(cfg.with_targets);
        assert!(cfg.with_threads);
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(serde_json::from_str::<LoggerConfig>(r#"{ "format": "xml" }"#).is_err());
    }
}
