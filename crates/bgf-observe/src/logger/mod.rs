mod config;
mod error;
mod format;
mod log;

pub use config::LoggerConfig;
pub use error::LoggerError;
pub use format::LoggerFormat;

/// Install the global `tracing` subscriber described by `cfg`.
pub fn logger_init(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    match cfg.format {
        LoggerFormat::Text => log::Logger::text(cfg),
        LoggerFormat::Json => log::Logger::json(cfg),
        LoggerFormat::Journald => log::Logger::journald(cfg),
    }?;
    tracing::debug!(format = ?cfg.format, level = %cfg.level, "logger initialized");
    Ok(())
}

/// [`logger_init`] with [`LoggerConfig::from_env`].
pub fn logger_init_from_env() -> Result<LoggerConfig, LoggerError> {
    let cfg = LoggerConfig::from_env()?;
    logger_init(&cfg)?;
    Ok(cfg)
}
