//! Per-job log file.
//!
//! Every line lands in `<logs>/<job id>.log`, is mirrored to `tracing` with
//! the job id attached, and is handed to the caller's callback if one was
//! given. ffmpeg and ffprobe stderr is kept as a short tail that is written
//! out when the tool fails.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

pub struct JobLogger {
    job_id: String,
    config: LogConfig,
    file: Mutex<Option<BufWriter<File>>>,
    callback: Option<LogCallback>,
    /// stderr of the most recent tool run, newest last.
    tool_tail: Mutex<VecDeque<String>>,
}

impl JobLogger {
    /// Open (append) the job's log file under `log_dir`.
    ///
    /// A re-run keeps the lines of earlier attempts above its own.
    pub fn new(
        job_id: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> std::io::Result<Self> {
        let job_id = job_id.into();
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join(format!("{}.log", sanitize_filename(&job_id))))?;

        let capacity = config.error_tail.max(1);
        Ok(Self {
            job_id,
            config,
            file: Mutex::new(Some(BufWriter::new(file))),
            callback,
            tool_tail: Mutex::new(VecDeque::with_capacity(capacity)),
        })
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }

        match level {
            LogLevel::Trace => tracing::trace!(job_id = %self.job_id, "{}", message),
            LogLevel::Debug => tracing::debug!(job_id = %self.job_id, "{}", message),
            LogLevel::Info => tracing::info!(job_id = %self.job_id, "{}", message),
            LogLevel::Warn => tracing::warn!(job_id = %self.job_id, "{}", message),
            LogLevel::Error => tracing::error!(job_id = %self.job_id, "{}", message),
        }
        self.write_line(message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, &MessagePrefix::Warning.format(message));
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, &MessagePrefix::Error.format(message));
    }

    /// Command line of an external tool about to run.
    pub fn command(&self, command: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Command.format(command));
    }

    pub fn phase(&self, phase_name: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Phase.format(phase_name));
    }

    pub fn section(&self, section_name: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Section.format(section_name));
    }

    pub fn success(&self, message: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Success.format(message));
    }

    /// Record the stderr of one finished tool run.
    ///
    /// The last `error_tail` non-blank lines replace the previous run's tail.
    /// Outside compact mode every line is written; in compact mode the tail
    /// is written only when `failed` is set.
    pub fn tool_output(&self, tool: &str, stderr: &str, failed: bool) {
        let mut tail = self.tool_tail.lock();
        tail.clear();
        let limit = self.config.error_tail.max(1);
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            if !self.config.compact {
                self.write_line(&format!("[{tool}] {line}"));
            }
            if tail.len() == limit {
                tail.pop_front();
            }
            tail.push_back(line.to_string());
        }

        if failed && self.config.compact && !tail.is_empty() {
            self.write_line(&format!("[{tool}/tail]"));
            for line in tail.iter() {
                self.write_line(line);
            }
        }
    }

    pub fn flush(&self) {
        if let Some(writer) = self.file.lock().as_mut() {
            let _ = writer.flush();
        }
    }

    fn write_line(&self, message: &str) {
        let line = if self.config.show_timestamps {
            format!("[{}] {}", Local::now().format("%H:%M:%S"), message)
        } else {
            message.to_string()
        };

        if let Some(writer) = self.file.lock().as_mut() {
            let _ = writeln!(writer, "{}", line);
        }
        if let Some(ref callback) = self.callback {
            callback(&line);
        }
    }
}

impl Drop for JobLogger {
    fn drop(&mut self) {
        self.flush();
        *self.file.lock() = None;
    }
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}
