//! The persisted job record.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::enums::{JobStatus, Phase, SyncMethod, SynthesisProvider};

/// Rejected lifecycle change.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Job '{job_id}' cannot move from {from} to {to}")]
    Invalid {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job '{job_id}' cannot complete, missing artifacts: {}", missing.join(", "))]
    MissingArtifacts {
        job_id: String,
        missing: Vec<&'static str>,
    },
}

/// One dubbing request tracked through the pipeline.
///
/// Artifact paths are filled in as their phases complete. The record is
/// only ever mutated by the orchestrator and written back to the store
/// with a revision check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub source_language: String,
    pub target_language: String,
    pub status: JobStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_video_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_audio_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_synthesized_audio_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjusted_audio_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_video_path: Option<PathBuf>,

    /// Failure message. Present only while `status == failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_phase: Option<Phase>,

    /// Upload file name as the client sent it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis_provider: Option<SynthesisProvider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_method: Option<SyncMethod>,

    /// Number of processing runs started for this id.
    #[serde(default)]
    pub attempt: u32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Store revision this copy was read at. Managed by the store.
    #[serde(default)]
    pub revision: u64,
}

impl Job {
    /// Create a freshly uploaded job.
    pub fn new(
        id: impl Into<String>,
        input_video_path: impl Into<PathBuf>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
            status: JobStatus::Uploaded,
            input_video_path: Some(input_video_path.into()),
            extracted_audio_path: None,
            raw_synthesized_audio_path: None,
            adjusted_audio_path: None,
            output_video_path: None,
            error_detail: None,
            failed_phase: None,
            original_name: None,
            size_bytes: None,
            transcript: None,
            translation: None,
            synthesis_provider: None,
            sync_method: None,
            attempt: 0,
            created_at: now,
            updated_at: now,
            completed_at: None,
            revision: 0,
        }
    }

    pub fn input_video(&self) -> Option<&Path> {
        self.input_video_path.as_deref()
    }

    /// Move to the next status, enforcing the lifecycle rules.
    ///
    /// Completing additionally requires every artifact path to be set.
    pub fn advance(&mut self, next: JobStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError::Invalid {
                job_id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }

        if next == JobStatus::Completed {
            let missing = self.missing_artifacts();
            if !missing.is_empty() {
                return Err(TransitionError::MissingArtifacts {
                    job_id: self.id.clone(),
                    missing,
                });
            }
            self.completed_at = Some(Utc::now());
        }

        self.status = next;
        self.touch();
        Ok(())
    }

    /// Mark the job failed with a message.
    pub fn fail(
        &mut self,
        phase: Option<Phase>,
        detail: impl Into<String>,
    ) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(JobStatus::Failed) {
            return Err(TransitionError::Invalid {
                job_id: self.id.clone(),
                from: self.status,
                to: JobStatus::Failed,
            });
        }

        let detail = detail.into();
        let detail = if detail.trim().is_empty() {
            "unknown error".to_string()
        } else {
            detail
        };

        self.status = JobStatus::Failed;
        self.error_detail = Some(detail);
        self.failed_phase = phase;
        self.touch();
        Ok(())
    }

    /// Start a new processing attempt for the same id.
    ///
    /// Clears everything produced by earlier attempts so that a completed
    /// status can only be reached with freshly recorded artifacts.
    pub fn restart(&mut self) {
        self.status = JobStatus::Uploaded;
        self.extracted_audio_path = None;
        self.raw_synthesized_audio_path = None;
        self.adjusted_audio_path = None;
        self.output_video_path = None;
        self.error_detail = None;
        self.failed_phase = None;
        self.transcript = None;
        self.translation = None;
        self.synthesis_provider = None;
        self.sync_method = None;
        self.completed_at = None;
        self.attempt += 1;
        self.touch();
    }

    /// Names of artifact paths that are not yet recorded.
    pub fn missing_artifacts(&self) -> Vec<&'static str> {
        let slots = [
            ("input_video_path", &self.input_video_path),
            ("extracted_audio_path", &self.extracted_audio_path),
            ("raw_synthesized_audio_path", &self.raw_synthesized_audio_path),
            ("adjusted_audio_path", &self.adjusted_audio_path),
            ("output_video_path", &self.output_video_path),
        ];

        slots
            .iter()
            .filter(|(_, path)| !matches!(path, Some(p) if !p.as_os_str().is_empty()))
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.status == JobStatus::Failed
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
