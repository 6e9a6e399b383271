//! Logging infrastructure for the multi-track player.
//!
//! This module provides:
//! - A per-session logger that feeds both `tracing` and the front-end event channel
//! - Compact mode with per-track progress filtering
//! - Application-wide subscriber setup (stderr, optionally a rolling file)
//!
//! # Example
//!
//! ```no_run
//! use mtp_core::logging::{LogConfig, SessionLogger};
//!
//! let logger = SessionLogger::new(LogConfig::default(), None);
//! logger.begin_session("movie.mkv");
//! logger.phase("Probe");
//! logger.command("ffprobe -v error -print_format json ...");
//! logger.progress(0, 0.4);
//! logger.success("Track #0 ready");
//! ```

mod session_logger;
mod types;

pub use session_logger::SessionLogger;
pub use types::{LogConfig, LogLevel, LogLine, MessagePrefix};

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize global tracing subscriber for application-wide logging.
///
/// Respects `RUST_LOG`, falling back to `default_level`. Output goes to stderr.
/// Should be called once at application startup.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_to_filter_str(default_level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}

/// Initialize tracing with stderr output plus a daily rolling file in `logs_dir`.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// lifetime of the application.
pub fn init_tracing_with_file(
    default_level: LogLevel,
    logs_dir: &Path,
) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)?;

    let file_appender = tracing_appender::rolling::daily(logs_dir, "multitrack-player.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_to_filter_str(default_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    Ok(guard)
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

/// Convert LogLevel to filter string.
fn level_to_filter_str(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}
