//! Structured logging setup using `tracing-subscriber` and `tracing-appender`.
//!
//! Two modes:
//! - **File** ([`init_file`]): JSON file layer (daily rotation) + console layer
//! - **Console** ([`init_console`]): stderr only
//!
//! The `*_from` variants take the level from [`LoggingConfig`]; `RUST_LOG`
//! still wins over it.
//!
//! The loader runs inside a host process that may already own the global
//! subscriber. Every init function leaves an existing subscriber in place
//! instead of failing.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Log file prefix inside the logs directory.
pub const LOG_FILE_PREFIX: &str = "aivk-loader.log";

/// Holds the non-blocking writer guard for file logging.
///
/// The [`WorkerGuard`] must be kept alive for the duration of the process.
/// Dropping it flushes pending log entries and closes the file.
pub struct LoggingGuard {
    _guard: WorkerGuard,
    installed: bool,
}

impl LoggingGuard {
    /// Whether this call installed the global subscriber. `false` means the
    /// host had already installed one and keeps receiving all events.
    pub fn installed(&self) -> bool {
        self.installed
    }
}

/// Build the env filter: `RUST_LOG` when set, else `default_level`.
fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialise file logging.
///
/// Writes JSON logs to `{logs_dir}/aivk-loader.log.YYYY-MM-DD` with daily
/// rotation and human-readable output to stderr.
///
/// # Errors
///
/// Returns an error if the logs directory cannot be created.
pub fn init_file(logs_dir: &Path, default_level: &str) -> anyhow::Result<LoggingGuard> {
    std::fs::create_dir_all(logs_dir).map_err(|e| {
        anyhow::anyhow!(
            "failed to create logs directory {}: {e}",
            logs_dir.display()
        )
    })?;

    let file_appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking);

    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let installed = tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(json_layer)
        .with(console_layer)
        .try_init()
        .is_ok();

    Ok(LoggingGuard {
        _guard: guard,
        installed,
    })
}

/// Initialise console-only logging to stderr.
///
/// Returns `true` when the subscriber was installed, `false` when one was
/// already present.
pub fn init_console(default_level: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

/// [`init_file`] at the level from the `[logging]` config section.
///
/// # Errors
///
/// Returns an error if the logs directory cannot be created.
pub fn init_file_from(logs_dir: &Path, config: &LoggingConfig) -> anyhow::Result<LoggingGuard> {
    init_file(logs_dir, &config.level)
}

/// [`init_console`] at the level from the `[logging]` config section.
pub fn init_console_from(config: &LoggingConfig) -> bool {
    init_console(&config.level)
}
