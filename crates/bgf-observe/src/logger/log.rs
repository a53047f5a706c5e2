use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, fmt::time::OffsetTime, layer::Layered,
    layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::logger::{config::LoggerConfig, error::LoggerError};

type Filtered = Layered<EnvFilter, Registry>;

pub struct Logger;

impl Logger {
    pub fn text(cfg: &LoggerConfig) -> Result<(), LoggerError> {
        let layer = fmt::layer()
            .with_ansi(cfg.use_color)
            .with_target(cfg.with_targets)
            .with_thread_names(cfg.with_threads)
            .with_timer(mk_timer());
        install(cfg, layer)
    }

    pub fn json(cfg: &LoggerConfig) -> Result<(), LoggerError> {
        let layer = fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(cfg.with_targets)
            .with_thread_names(cfg.with_threads)
            .with_current_span(true)
            .with_timer(mk_timer());
        install(cfg, layer)
    }

    pub fn journald(cfg: &LoggerConfig) -> Result<(), LoggerError> {
        install(cfg, mk_journald()?)
    }
}

fn install<L>(cfg: &LoggerConfig, layer: L) -> Result<(), LoggerError>
where
    L: Layer<Filtered> + Send + Sync + 'static,
{
    let filter = mk_filter(&cfg.level)?;
    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(as_error)
}

/// An empty level defers to `RUST_LOG`.
fn mk_filter(level: &str) -> Result<EnvFilter, LoggerError> {
    if level.trim().is_empty() {
        return Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));
    }
    EnvFilter::try_new(level).map_err(|_| LoggerError::InvalidLogLevel(level.to_string()))
}

fn mk_timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

fn as_error(e: impl std::fmt::Display) -> LoggerError {
    let s = e.to_string();
    if s.contains("SetGlobalDefaultError") || s.contains("global default") {
        LoggerError::AlreadyInitialized
    } else {
        LoggerError::InitializationFailed(s)
    }
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn mk_journald() -> Result<tracing_journald::Layer, LoggerError> {
    tracing_journald::layer()
        .map_err(|e| LoggerError::InitializationFailed(format!("journald: {e}")))
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn mk_journald() -> Result<fmt::Layer<Filtered>, LoggerError> {
    Err(LoggerError::JournaldNotSupported)
}
