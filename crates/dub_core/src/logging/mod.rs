//! Logging infrastructure for the dubbing pipeline.
//!
//! This module provides:
//! - Per-job loggers with file + callback dual output
//! - A tail of ffmpeg/ffprobe stderr written out when a tool fails
//! - Integration with the `tracing` ecosystem
//!
//! # Example
//!
//! ```no_run
//! use dub_core::logging::{JobLogger, LogConfig};
//!
//! let logger = JobLogger::new("3f2a...", "/path/to/logs", LogConfig::default(), None).unwrap();
//!
//! logger.phase("Extract");
//! logger.command("ffmpeg -i input.mp4 ...");
//! logger.success("Audio extracted");
//! ```

mod job_logger;
mod types;

use std::path::Path;

pub use job_logger::JobLogger;
pub use types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize global tracing subscriber for application-wide logging.
///
/// Respects `RUST_LOG`, falling back to `default_level`. Output goes to
/// stderr. Call once at startup.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_to_filter_str(default_level)));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .try_init();
}

/// Initialize tracing to stderr plus a daily rolling file in `logs_dir`.
///
/// Keep the returned guard alive for the lifetime of the process so
/// buffered lines are flushed on exit.
pub fn init_tracing_with_file(default_level: LogLevel, logs_dir: &Path) -> Option<WorkerGuard> {
    if let Err(e) = std::fs::create_dir_all(logs_dir) {
        eprintln!(
            "Failed to create logs directory {}: {}. Logging to stderr only.",
            logs_dir.display(),
            e
        );
        init_tracing(default_level);
        return None;
    }

    let appender = tracing_appender::rolling::daily(logs_dir, "dubbing.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_to_filter_str(default_level)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .try_init();

    Some(guard)
}

fn level_to_filter_str(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}
