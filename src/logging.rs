//! Logging initialization for stepable.
//!
//! Logs go to stderr unless `logging.to_file` is set, in which case they are
//! written to `{logging.dir}/stepable-{datetime}.log`.

use anyhow::Result;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Result of logging initialization
pub struct LoggingHandle {
    /// Guard that must be kept alive for the duration of the program.
    /// When dropped, ensures all buffered logs are flushed.
    pub _guard: Option<WorkerGuard>,

    /// Path to the log file (only set with file logging enabled)
    pub log_file_path: Option<PathBuf>,
}

/// Effective filter directive: `--debug` beats the configured level
pub fn log_level(config: &Config, debug_override: bool) -> String {
    if debug_override {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    }
}

/// Log file name for a given timestamp, e.g. `stepable-20260101T120000Z.log`
pub fn log_file_name(timestamp: chrono::DateTime<chrono::Utc>) -> String {
    format!("stepable-{}.log", timestamp.format("%Y%m%dT%H%M%SZ"))
}

/// Initialize logging based on configuration.
///
/// # Arguments
/// * `config` - Application configuration
/// * `debug_override` - If true, override log level to "debug" (from --debug flag)
///
/// # Returns
/// A `LoggingHandle` that must be kept alive for the duration of the program.
pub fn init_logging(config: &Config, debug_override: bool) -> Result<LoggingHandle> {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| log_level(config, debug_override)),
    );

    if config.logging.to_file {
        let logs_dir = config.logs_path();
        std::fs::create_dir_all(&logs_dir)?;

        let log_filename = log_file_name(chrono::Utc::now());
        let log_file_path = logs_dir.join(&log_filename);

        let file_appender = tracing_appender::rolling::never(&logs_dir, &log_filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false) // No ANSI codes in log files
                    .with_writer(non_blocking),
            )
            .init();

        Ok(LoggingHandle {
            _guard: Some(guard),
            log_file_path: Some(log_file_path),
        })
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();

        Ok(LoggingHandle {
            _guard: None,
            log_file_path: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.logging.dir = temp_dir.path().join("logs").to_string_lossy().to_string();
        config
    }

    #[test]
    fn test_logs_path_uses_configured_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let logs_dir = config.logs_path();
        assert!(logs_dir.ends_with("logs"));
        assert!(logs_dir.starts_with(temp_dir.path()));
    }

    #[test]
    fn test_log_file_name_format() {
        let timestamp = chrono::Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(log_file_name(timestamp), "stepable-20260102T030405Z.log");
    }

    #[test]
    fn test_debug_flag_overrides_level() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        config.logging.level = "error".to_string();

        assert_eq!(log_level(&config, false), "error");
        assert_eq!(log_level(&config, true), "debug");
    }

    #[test]
    fn test_file_logging_writes_to_configured_dir() {
        // Installs the global subscriber, so this is the only test that calls
        // init_logging
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        config.logging.to_file = true;

        let handle = init_logging(&config, true).unwrap();
        let log_path = handle.log_file_path.clone().unwrap();
        assert!(log_path.starts_with(temp_dir.path().join("logs")));
        assert!(log_path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("stepable-"));

        tracing::warn!("wizard log line");
        drop(handle);

        let contents = std::fs::read_to_string(&log_path).unwrap();
        assert!(contents.contains("wizard log line"), "{contents}");
        assert!(!contents.contains('\u{1b}'), "file logs carry no ANSI codes");
    }
}
