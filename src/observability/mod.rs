// src/observability/mod.rs
//! Logging setup
//!
//! Installs a `tracing` subscriber with an `EnvFilter` (configured level by
//! default, `RUST_LOG` wins when set) and a pretty or JSON formatter.

use crate::utils::config::{LogFormat, LoggingConfig};
use crate::utils::errors::{EngineError, Result};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Initialize tracing. Returns `false` when a global subscriber was already
/// installed, which is not an error.
pub fn init_tracing(config: &LoggingConfig) -> Result<bool> {
    let level = parse_log_level(&config.level)?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_names(true)
            .with_filter(env_filter)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .with_filter(env_filter)
            .boxed(),
    };

    let installed = tracing_subscriber::registry().with(layer).try_init().is_ok();
    if installed {
        tracing::info!(level = %config.level, format = ?config.format, "logger initialized");
    }
    Ok(installed)
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(EngineError::ConfigError(format!("Invalid log level: {}", level))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert!(matches!(parse_log_level("debug"), Ok(Level::DEBUG)));
        assert!(matches!(parse_log_level("WARN"), Ok(Level::WARN)));
        assert!(parse_log_level("chatty").is_err());
    }

    #[test]
    fn test_second_init_is_not_an_error() {
        let config = LoggingConfig::default();
        let _ = init_tracing(&config).unwrap();
        assert!(!init_tracing(&config).unwrap());
    }
}
