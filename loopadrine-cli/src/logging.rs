//! Tracing subscriber setup
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies. With a
//! log file configured, output is appended there without ANSI colors.

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use loopadrine_common::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Build the filter from `RUST_LOG`, falling back to `config.level`
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .with_context(|| format!("Invalid log level {:?}", config.level)),
    }
}

/// Install the global subscriber
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config)?)
        .with_target(false);

    match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tracing_subscriber::filter::LevelFilter;

    fn config(level: &str) -> LoggingConfig {
        LoggingConfig {
            level: level.to_string(),
            file: None,
        }
    }

    #[test]
    #[serial]
    fn test_configured_level_without_rust_log() {
        std::env::remove_var("RUST_LOG");
        let filter = env_filter(&config("debug")).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    #[serial]
    fn test_rust_log_overrides_config() {
        std::env::set_var("RUST_LOG", "warn");
        let filter = env_filter(&config("trace"));
        std::env::remove_var("RUST_LOG");
        assert_eq!(filter.unwrap().max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    #[serial]
    fn test_invalid_configured_level() {
        std::env::remove_var("RUST_LOG");
        assert!(env_filter(&config("loopadrine=loud")).is_err());
    }
}
