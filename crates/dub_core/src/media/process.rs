//! Subprocess execution with a kill-on-deadline timeout.
//!
//! Output pipes are drained on reader threads so a chatty tool can never
//! block on a full pipe while we poll for exit.

use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::ToolSettings;
use crate::logging::JobLogger;

/// How often the child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long to wait for the reader threads after the child exits.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Lines of stderr carried in a failure message.
const MESSAGE_TAIL_LINES: usize = 5;

/// Failure of an external tool invocation.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{tool} not found (is it installed and on PATH?)")]
    NotFound { tool: String },

    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed with exit code {exit_code}: {message}")]
    Failed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    #[error("{tool} timed out after {}s", timeout.as_secs())]
    TimedOut { tool: String, timeout: Duration },

    #[error("I/O error while running {tool}: {source}")]
    Io {
        tool: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured output of a successful run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ToolOutput {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// One external program with its time limit.
#[derive(Clone)]
pub struct ToolRunner {
    program: String,
    timeout: Duration,
    logger: Option<Arc<JobLogger>>,
}

impl ToolRunner {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
            logger: None,
        }
    }

    /// Mirror commands and tool output into a job log.
    pub fn with_logger(mut self, logger: Arc<JobLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the program to completion, killing it at the deadline.
    ///
    /// A non-zero exit is an error carrying the last stderr lines. The
    /// full stderr goes to the job log tail buffer either way.
    pub fn run(&self, args: &[String]) -> Result<ToolOutput, ToolError> {
        let rendered = format!("{} {}", self.program, args.join(" "));
        match self.logger {
            Some(ref logger) => logger.command(&rendered),
            None => tracing::debug!("$ {}", rendered),
        }

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ToolError::NotFound {
                        tool: self.program.clone(),
                    }
                } else {
                    ToolError::Spawn {
                        tool: self.program.clone(),
                        source: e,
                    }
                }
            })?;

        let stdout_rx = child.stdout.take().map(spawn_reader);
        let stderr_rx = child.stderr.take().map(spawn_reader);

        let started_at = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ToolError::Io {
                        tool: self.program.clone(),
                        source: e,
                    });
                }
            }

            if started_at.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                let stderr = collect(stderr_rx);
                self.record_stderr(&stderr, true);
                return Err(ToolError::TimedOut {
                    tool: self.program.clone(),
                    timeout: self.timeout,
                });
            }

            thread::sleep(POLL_INTERVAL);
        };

        let stdout = collect(stdout_rx);
        let stderr = String::from_utf8_lossy(&collect(stderr_rx)).into_owned();
        self.record_stderr(stderr.as_bytes(), !status.success());

        self.check_status(status, &stderr)?;
        Ok(ToolOutput { stdout, stderr })
    }

    fn check_status(&self, status: ExitStatus, stderr: &str) -> Result<(), ToolError> {
        if status.success() {
            return Ok(());
        }

        Err(ToolError::Failed {
            tool: self.program.clone(),
            exit_code: status.code().unwrap_or(-1),
            message: stderr_tail(stderr, MESSAGE_TAIL_LINES),
        })
    }

    fn record_stderr(&self, stderr: &[u8], failed: bool) {
        if let Some(ref logger) = self.logger {
            logger.tool_output(&self.program, &String::from_utf8_lossy(stderr), failed);
        }
    }
}

/// The ffmpeg/ffprobe pair every media component runs through.
#[derive(Clone)]
pub struct MediaTools {
    pub ffmpeg: ToolRunner,
    pub ffprobe: ToolRunner,
}

impl MediaTools {
    pub fn from_settings(settings: &ToolSettings) -> Self {
        Self {
            ffmpeg: ToolRunner::new(&settings.ffmpeg_path, settings.timeout()),
            ffprobe: ToolRunner::new(&settings.ffprobe_path, settings.probe_timeout()),
        }
    }

    /// Attach a job log to both tools.
    pub fn with_logger(self, logger: Arc<JobLogger>) -> Self {
        Self {
            ffmpeg: self.ffmpeg.with_logger(Arc::clone(&logger)),
            ffprobe: self.ffprobe.with_logger(logger),
        }
    }

    pub fn logger(&self) -> Option<&JobLogger> {
        self.ffmpeg.logger.as_deref()
    }

    /// Informational note to the job log, or to tracing without one.
    pub fn note(&self, message: &str) {
        match self.logger() {
            Some(logger) => logger.info(message),
            None => tracing::info!("{}", message),
        }
    }

    pub fn warn(&self, message: &str) {
        match self.logger() {
            Some(logger) => logger.warn(message),
            None => tracing::warn!("{}", message),
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(buf);
    });
    rx
}

fn collect(rx: Option<mpsc::Receiver<Vec<u8>>>) -> Vec<u8> {
    rx.and_then(|rx| rx.recv_timeout(DRAIN_TIMEOUT).ok())
        .unwrap_or_default()
}

/// Last `n` non-empty lines of stderr joined with " | ".
fn stderr_tail(stderr: &str, n: usize) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return "no output".to_string();
    }
    let start = lines.len().saturating_sub(n);
    lines[start..].join(" | ")
}
