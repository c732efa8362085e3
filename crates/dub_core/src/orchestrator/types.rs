//! Core types for the orchestrator pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use super::errors::{PipelineError, PipelineResult};
use crate::clients::{
    build_transcriber, build_translator, SpeechBackend, SynthesisClient, SynthesisError,
    Transcriber, TranscriptionError, TranslationError, Translator,
};
use crate::config::Settings;
use crate::logging::JobLogger;
use crate::media::MediaTools;
use crate::models::Job;
use crate::store::{JobStore, StoreError};

/// Progress callback type for reporting pipeline progress.
///
/// Arguments: (step_name, percent_complete, message)
pub type ProgressCallback = Box<dyn Fn(&str, u32, &str) + Send + Sync>;

/// Remote backends shared by every job of a process.
pub struct Services {
    pub transcriber: Box<dyn Transcriber>,
    pub translator: Box<dyn Translator>,
    pub synthesizer: Box<dyn SpeechBackend>,
}

#[derive(Error, Debug)]
pub enum ServicesError {
    #[error("Transcription backend setup failed: {0}")]
    Transcription(#[from] TranscriptionError),

    #[error("Translation backend setup failed: {0}")]
    Translation(#[from] TranslationError),

    #[error("Synthesis backend setup failed: {0}")]
    Synthesis(#[from] SynthesisError),
}

impl Services {
    /// Build the configured backends. The synthesis variant is fixed here.
    pub fn from_settings(settings: &Settings) -> Result<Self, ServicesError> {
        Ok(Self {
            transcriber: build_transcriber(&settings.transcription)?,
            translator: build_translator(&settings.translation)?,
            synthesizer: Box::new(SynthesisClient::from_settings(
                &settings.synthesis,
                &settings.tools,
            )?),
        })
    }
}

/// Read-only context passed to pipeline steps.
///
/// Contains configuration and shared resources that steps can read
/// but not modify. The mutable record is the `Job` itself.
pub struct Context {
    /// Application settings.
    pub settings: Settings,
    /// Job identifier.
    pub job_id: String,
    /// Job-specific working directory; every artifact lands here.
    pub work_dir: PathBuf,
    /// Per-job logger.
    pub logger: Arc<JobLogger>,
    /// ffmpeg/ffprobe runners wired to the job logger.
    pub tools: MediaTools,
    pub services: Arc<Services>,
    pub store: Arc<JobStore>,
    /// Optional progress callback.
    progress_callback: Option<ProgressCallback>,
}

impl Context {
    pub fn new(
        settings: Settings,
        job_id: impl Into<String>,
        work_dir: PathBuf,
        logger: Arc<JobLogger>,
        services: Arc<Services>,
        store: Arc<JobStore>,
    ) -> Self {
        let tools = MediaTools::from_settings(&settings.tools).with_logger(Arc::clone(&logger));
        Self {
            settings,
            job_id: job_id.into(),
            work_dir,
            logger,
            tools,
            services,
            store,
            progress_callback: None,
        }
    }

    /// Set the progress callback.
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Report progress to callback (if set).
    pub fn report_progress(&self, step_name: &str, percent: u32, message: &str) {
        if let Some(ref callback) = self.progress_callback {
            callback(step_name, percent, message);
        }
    }

    /// Deterministic artifact path for this job: `<work_dir>/<id>_<suffix>`.
    pub fn artifact_path(&self, suffix: &str) -> PathBuf {
        self.work_dir.join(format!("{}_{}", self.job_id, suffix))
    }

    /// Write `job` back to the store and pick up its new revision.
    ///
    /// A revision conflict against a record that is now `failed` means the
    /// job was aborted while this run held it.
    pub fn persist(&self, job: &mut Job) -> PipelineResult<()> {
        match self.store.replace(job) {
            Ok(stored) => {
                *job = stored;
                Ok(())
            }
            Err(conflict @ StoreError::Conflict { .. }) => match self.store.load(&job.id) {
                Ok(current) if current.is_failed() => {
                    self.logger.warn("Job was aborted, stopping");
                    Err(PipelineError::aborted(&job.id))
                }
                _ => Err(PipelineError::store(&job.id, conflict)),
            },
            Err(e) => Err(PipelineError::store(&job.id, e)),
        }
    }
}

/// Result of executing a pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step completed successfully.
    Success,
    /// Step had nothing to do (not an error).
    Skipped(String),
}
