//! Error types for the orchestrator pipeline.
//!
//! Errors carry context that chains through layers:
//! Job → Step → Component → Detail

use std::io;

use thiserror::Error;

use crate::clients::{SynthesisError, TranscriptionError, TranslationError};
use crate::media::{ExtractionError, MuxError, ProbeError};
use crate::models::{JobStatus, Phase, TransitionError};
use crate::store::StoreError;
use crate::sync::SyncError;

/// Top-level pipeline error with job context.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A step failed during execution.
    #[error("Job '{job_id}' failed at step '{step_name}': {source}")]
    StepFailed {
        job_id: String,
        step_name: String,
        phase: Phase,
        #[source]
        source: StepError,
    },

    /// The job cannot be processed in its current form.
    #[error("Job '{job_id}' failed validation: {message}")]
    ValidationFailed { job_id: String, message: String },

    /// Pipeline was cancelled through its handle.
    #[error("Job '{job_id}' was cancelled")]
    Cancelled { job_id: String },

    /// The stored record was marked failed by someone else.
    #[error("Job '{job_id}' was aborted")]
    Aborted { job_id: String },

    /// Another run holds the job mid-phase.
    #[error("Job '{job_id}' is already in progress (status: {status}); use force to take it over")]
    InProgress { job_id: String, status: JobStatus },

    /// Failed to set up job (create directories, open logs).
    #[error("Job '{job_id}' setup failed: {message}")]
    SetupFailed { job_id: String, message: String },

    /// A lifecycle rule rejected a status change.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("Job '{job_id}' could not be persisted: {source}")]
    Store {
        job_id: String,
        #[source]
        source: StoreError,
    },
}

impl PipelineError {
    pub fn step_failed(
        job_id: impl Into<String>,
        step_name: impl Into<String>,
        phase: Phase,
        source: StepError,
    ) -> Self {
        Self::StepFailed {
            job_id: job_id.into(),
            step_name: step_name.into(),
            phase,
            source,
        }
    }

    pub fn validation_failed(job_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            job_id: job_id.into(),
            message: message.into(),
        }
    }

    pub fn setup_failed(job_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SetupFailed {
            job_id: job_id.into(),
            message: message.into(),
        }
    }

    pub fn cancelled(job_id: impl Into<String>) -> Self {
        Self::Cancelled {
            job_id: job_id.into(),
        }
    }

    pub fn aborted(job_id: impl Into<String>) -> Self {
        Self::Aborted {
            job_id: job_id.into(),
        }
    }

    pub fn in_progress(job_id: impl Into<String>, status: JobStatus) -> Self {
        Self::InProgress {
            job_id: job_id.into(),
            status,
        }
    }

    pub fn store(job_id: impl Into<String>, source: StoreError) -> Self {
        Self::Store {
            job_id: job_id.into(),
            source,
        }
    }

    /// Phase to record on the job, when one applies.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::StepFailed { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Whether the stored record already reflects the end of this run,
    /// so it must not be overwritten with a failure.
    pub fn record_is_settled(&self) -> bool {
        matches!(
            self,
            Self::Aborted { .. }
                | Self::InProgress { .. }
                | Self::Store {
                    source: StoreError::Conflict { .. } | StoreError::NotFound(_),
                    ..
                }
        )
    }
}

/// Error from a pipeline step.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    #[error("Required file not found: {path}")]
    FileNotFound { path: String },

    #[error("I/O error in {operation}: {source}")]
    IoError {
        operation: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Transcription(#[from] TranscriptionError),

    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Mux(#[from] MuxError),
}

impl StepError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::IoError {
            operation: operation.into(),
            source,
        }
    }

    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_error_chains_context() {
        let step_err = StepError::file_not_found("/work/job-1/job-1_audio.wav");
        let err = PipelineError::step_failed("job-1", "Transcribe", Phase::Transcribe, step_err);

        let msg = err.to_string();
        assert!(msg.contains("job-1"));
        assert!(msg.contains("Transcribe"));
        assert!(msg.contains("job-1_audio.wav"));
        assert_eq!(err.phase(), Some(Phase::Transcribe));
    }

    #[test]
    fn component_errors_keep_their_message() {
        let err: StepError = TranslationError::EmptyResult.into();
        assert_eq!(err.to_string(), TranslationError::EmptyResult.to_string());
    }

    #[test]
    fn conflicts_and_aborts_are_settled() {
        assert!(PipelineError::aborted("a").record_is_settled());
        let conflict = PipelineError::store(
            "a",
            StoreError::Conflict {
                id: "a".into(),
                expected: 1,
                found: 2,
            },
        );
        assert!(conflict.record_is_settled());
        assert!(PipelineError::in_progress("a", JobStatus::Syncing).record_is_settled());
        assert!(!PipelineError::cancelled("a").record_is_settled());
    }
}
