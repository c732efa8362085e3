//! Runs stored jobs through the dubbing pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Settings;
use crate::logging::{JobLogger, LogCallback, LogConfig};
use crate::models::Job;
use crate::store::{JobStore, StoreError};

use super::errors::{PipelineError, PipelineResult};
use super::pipeline::CancelHandle;
use super::types::{Context, ProgressCallback, Services};
use super::{create_dubbing_pipeline, PipelineRunResult};

/// Result of processing a single job.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub job_id: String,
    pub success: bool,
    /// Path to the dubbed video (if successful).
    pub output_path: Option<PathBuf>,
    /// Error message (if failed).
    pub error: Option<String>,
    pub steps_completed: Vec<String>,
}

impl JobResult {
    pub fn success(job_id: String, output_path: PathBuf, run_result: PipelineRunResult) -> Self {
        Self {
            job_id,
            success: true,
            output_path: Some(output_path),
            error: None,
            steps_completed: run_result.steps_completed,
        }
    }

    pub fn failure(job_id: String, error: impl Into<String>) -> Self {
        Self {
            job_id,
            success: false,
            output_path: None,
            error: Some(error.into()),
            steps_completed: Vec::new(),
        }
    }
}

/// Takes a job id, runs the full chain, and leaves the stored record
/// either `completed` or `failed`.
///
/// Processing a job that already finished (or was interrupted) starts a
/// new attempt from the beginning; outputs are overwritten because every
/// artifact name is derived from the job id.
///
/// # Example
///
/// ```ignore
/// let processor = DubbingProcessor::new(settings, store, services);
/// let result = processor.process_job("3f2b...", None, None);
/// ```
pub struct DubbingProcessor {
    settings: Settings,
    store: Arc<JobStore>,
    services: Arc<Services>,
    /// Per-job work directories live under here.
    work_root: PathBuf,
    log_dir: PathBuf,
    /// Take over jobs whose stored status is mid-phase.
    force: bool,
}

impl DubbingProcessor {
    pub fn new(settings: Settings, store: Arc<JobStore>, services: Arc<Services>) -> Self {
        Self {
            work_root: settings.paths.workspace_root(),
            log_dir: settings.paths.logs_folder(),
            settings,
            store,
            services,
            force: false,
        }
    }

    /// Allow restarting jobs another run left mid-phase, e.g. after a
    /// crash. Without it such jobs are refused untouched.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Process one job.
    ///
    /// Never panics on job errors; the outcome is in the returned
    /// `JobResult` and in the stored record.
    pub fn process_job(
        &self,
        job_id: &str,
        log_callback: Option<LogCallback>,
        progress_callback: Option<ProgressCallback>,
    ) -> JobResult {
        self.process_job_with_cancel(job_id, log_callback, progress_callback, None)
    }

    /// Like `process_job`, stopping at the next step boundary once
    /// `cancel` fires. A cancelled job is recorded as failed.
    pub fn process_job_with_cancel(
        &self,
        job_id: &str,
        log_callback: Option<LogCallback>,
        progress_callback: Option<ProgressCallback>,
        cancel: Option<&CancelHandle>,
    ) -> JobResult {
        let mut job = match self.begin_attempt(job_id) {
            Ok(job) => job,
            Err(e) => {
                tracing::error!("Cannot start job {}: {}", job_id, e);
                return JobResult::failure(job_id.to_string(), e.to_string());
            }
        };

        let ctx = match self.build_context(&job, log_callback) {
            Ok(ctx) => ctx,
            Err(e) => return self.finish_failed(&mut job, None, e),
        };
        let ctx = match progress_callback {
            Some(callback) => ctx.with_progress_callback(callback),
            None => ctx,
        };

        let pipeline = match cancel {
            Some(handle) => create_dubbing_pipeline().with_cancel_handle(handle),
            None => create_dubbing_pipeline(),
        };

        ctx.logger.section(&format!("Job {} (attempt {})", job.id, job.attempt));
        ctx.logger.info(&format!(
            "Languages: {} -> {}",
            job.source_language, job.target_language
        ));
        if let Some(name) = &job.original_name {
            ctx.logger.info(&format!("Upload: {}", name));
        }

        let outcome = pipeline.run(&ctx, &mut job);
        match outcome {
            Ok(run_result) => {
                let output = job.output_video_path.clone().unwrap_or_default();
                ctx.logger.success(&format!("Dubbed video: {}", output.display()));
                tracing::info!(job_id = %job.id, "Job completed");
                ctx.logger.flush();
                JobResult::success(job.id.clone(), output, run_result)
            }
            Err(e) => {
                let result = self.finish_failed(&mut job, Some(&ctx), e);
                ctx.logger.flush();
                result
            }
        }
    }

    /// Load the job and open a fresh attempt on it.
    fn begin_attempt(&self, job_id: &str) -> PipelineResult<Job> {
        let mut job = self
            .store
            .load(job_id)
            .map_err(|e| PipelineError::store(job_id, e))?;

        if job.status.is_in_progress() {
            if !self.force {
                return Err(PipelineError::in_progress(job_id, job.status));
            }
            tracing::warn!(job_id, status = %job.status, "Taking over job left mid-phase");
        }

        if job.attempt > 0 || job.status.is_terminal() {
            tracing::info!(
                job_id,
                previous = %job.status,
                "Starting attempt {}",
                job.attempt + 1
            );
        }
        job.restart();

        self.store
            .replace(&job)
            .map_err(|e| PipelineError::store(job_id, e))
    }

    fn build_context(&self, job: &Job, log_callback: Option<LogCallback>) -> PipelineResult<Context> {
        let work_dir = self.work_root.join(&job.id);
        std::fs::create_dir_all(&work_dir).map_err(|e| {
            PipelineError::setup_failed(&job.id, format!("Failed to create work directory: {}", e))
        })?;

        let logger = JobLogger::new(
            &job.id,
            &self.log_dir,
            LogConfig::from_settings(&self.settings.logging),
            log_callback,
        )
        .map_err(|e| PipelineError::setup_failed(&job.id, format!("Failed to create logger: {}", e)))?;

        Ok(Context::new(
            self.settings.clone(),
            &job.id,
            work_dir,
            Arc::new(logger),
            Arc::clone(&self.services),
            Arc::clone(&self.store),
        ))
    }

    /// Record the failure unless the stored record already settled it.
    fn finish_failed(&self, job: &mut Job, ctx: Option<&Context>, error: PipelineError) -> JobResult {
        let message = error.to_string();
        if let Some(ctx) = ctx {
            ctx.logger.error(&message);
        }
        tracing::warn!(job_id = %job.id, "Job failed: {}", message);

        if error.record_is_settled() {
            return JobResult::failure(job.id.clone(), message);
        }

        if let Err(e) = job.fail(error.phase(), &message) {
            tracing::warn!(job_id = %job.id, "Cannot mark job failed: {}", e);
            return JobResult::failure(job.id.clone(), message);
        }
        match self.store.replace(job) {
            Ok(stored) => *job = stored,
            Err(e) => tracing::warn!(job_id = %job.id, "Failed to persist failure: {}", e),
        }
        JobResult::failure(job.id.clone(), message)
    }

    /// Mark a job failed from outside the run; see [`abort_job`].
    pub fn abort(&self, job_id: &str, reason: &str) -> Result<Job, StoreError> {
        abort_job(&self.store, job_id, reason)
    }
}

/// Mark a live job failed so its runner stops at the next boundary.
///
/// A job that already reached a terminal status is returned unchanged.
/// Revision conflicts with a concurrent runner are retried.
pub fn abort_job(store: &JobStore, job_id: &str, reason: &str) -> Result<Job, StoreError> {
    const ATTEMPTS: usize = 5;

    let mut last_conflict = None;
    for _ in 0..ATTEMPTS {
        let mut job = store.load(job_id)?;
        if job.status.is_terminal() {
            return Ok(job);
        }

        let detail = format!("aborted: {}", reason);
        if job.fail(None, detail).is_err() {
            return Ok(job);
        }
        match store.replace(&job) {
            Ok(stored) => {
                tracing::info!(job_id, "Job aborted");
                return Ok(stored);
            }
            Err(e @ StoreError::Conflict { .. }) => last_conflict = Some(e),
            Err(e) => return Err(e),
        }
    }

    Err(last_conflict.unwrap_or_else(|| StoreError::NotFound(job_id.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::test_support::{ffmpeg_available, write_tone_video};
    use crate::models::{JobStatus, Phase, SyncMethod, SynthesisProvider};
    use crate::orchestrator::test_support::{
        mock_services, FailingTranscriber, FixedTranscriber, Harness,
    };

    fn upload(harness: &Harness, id: &str, video_secs: Option<f64>) -> Job {
        let video = harness.dir.path().join(format!("{id}.mp4"));
        if let Some(secs) = video_secs {
            write_tone_video(&video, secs).unwrap();
        }
        harness
            .store
            .create(&Job::new(id, video, "en", "es"))
            .unwrap()
    }

    fn processor(harness: &Harness) -> DubbingProcessor {
        DubbingProcessor::new(
            harness.settings(),
            Arc::clone(&harness.store),
            Arc::clone(&harness.services),
        )
    }

    #[test]
    fn job_result_failure() {
        let result = JobResult::failure("job-456".to_string(), "Something went wrong");
        assert!(!result.success);
        assert!(result.output_path.is_none());
        assert_eq!(result.error.as_deref(), Some("Something went wrong"));
    }

    #[test]
    fn unknown_job_is_a_failure_result() {
        let harness = Harness::new();
        let result = processor(&harness).process_job("missing", None, None);
        assert!(!result.success);
        assert!(result.error.unwrap().contains("not found"));
    }

    #[test]
    fn missing_input_fails_extract_phase() {
        let harness = Harness::new();
        upload(&harness, "j1", None);

        let result = processor(&harness).process_job("j1", None, None);
        assert!(!result.success);

        let stored = harness.store.load("j1").unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.failed_phase, Some(Phase::Extract));
        assert!(!stored.error_detail.unwrap().trim().is_empty());
        assert_eq!(stored.attempt, 1);
    }

    #[test]
    fn backend_failure_marks_job_failed() {
        if !ffmpeg_available() {
            return;
        }
        let harness = Harness::with_services(mock_services(Box::new(FailingTranscriber), 1.0));
        upload(&harness, "j2", Some(2.0));

        let result = processor(&harness).process_job("j2", None, None);
        assert!(!result.success);

        let stored = harness.store.load("j2").unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.failed_phase, Some(Phase::Transcribe));
        assert!(stored.error_detail.unwrap().contains("model is loading"));
        assert!(stored.extracted_audio_path.is_some());
        assert!(stored.output_video_path.is_none());
    }

    #[test]
    fn silent_transcript_fails_at_translation() {
        if !ffmpeg_available() {
            return;
        }
        let harness = Harness::with_services(mock_services(Box::new(FixedTranscriber("  ")), 1.0));
        upload(&harness, "j3", Some(1.0));

        processor(&harness).process_job("j3", None, None);

        let stored = harness.store.load("j3").unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.failed_phase, Some(Phase::Translate));
        assert_eq!(stored.transcript.as_deref(), Some("  "));
    }

    #[test]
    fn full_chain_completes_with_all_artifacts() {
        if !ffmpeg_available() {
            return;
        }
        let harness = Harness::with_services(mock_services(
            Box::new(FixedTranscriber("Good morning.")),
            2.0,
        ));
        upload(&harness, "j4", Some(3.0));

        let progress = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&progress);
        let result = processor(&harness).process_job(
            "j4",
            None,
            Some(Box::new(move |step, percent, _| {
                sink.lock().push((step.to_string(), percent));
            })),
        );
        assert!(result.success, "{:?}", result.error);
        assert_eq!(
            result.steps_completed,
            vec!["Extract", "Transcribe", "Translate", "Synthesize", "Sync", "Mux"]
        );

        let stored = harness.store.load("j4").unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert!(stored.missing_artifacts().is_empty());
        assert!(stored.error_detail.is_none());
        assert_eq!(stored.translation.as_deref(), Some("[es] Good morning."));
        assert_eq!(stored.synthesis_provider, Some(SynthesisProvider::CloudTts));
        assert!(matches!(
            stored.sync_method,
            Some(SyncMethod::Rubberband | SyncMethod::ChainedTempo)
        ));

        let output = stored.output_video_path.unwrap();
        assert_eq!(output.file_name().unwrap(), "j4_dubbed.mp4");
        assert!(output.is_file());
        assert_eq!(result.output_path, Some(output));

        let progress = progress.lock();
        assert_eq!(progress.first().map(|p| p.1), Some(0));
        assert_eq!(progress.last().cloned(), Some(("Complete".to_string(), 100)));
    }

    #[test]
    fn reprocessing_starts_a_new_attempt() {
        let harness = Harness::new();
        upload(&harness, "j5", None);
        let processor = processor(&harness);

        processor.process_job("j5", None, None);
        processor.process_job("j5", None, None);

        let stored = harness.store.load("j5").unwrap();
        assert_eq!(stored.attempt, 2);
        assert_eq!(stored.status, JobStatus::Failed);
    }

    fn leave_mid_phase(harness: &Harness, id: &str) -> Job {
        let mut job = upload(harness, id, None);
        job.restart();
        let mut job = harness.store.replace(&job).unwrap();
        job.advance(JobStatus::Extracting).unwrap();
        harness.store.replace(&job).unwrap()
    }

    #[test]
    fn live_job_is_refused_untouched() {
        let harness = Harness::new();
        let live = leave_mid_phase(&harness, "live1");

        let result = processor(&harness).process_job("live1", None, None);
        assert!(!result.success);
        assert!(result.error.unwrap().contains("already in progress"));

        let stored = harness.store.load("live1").unwrap();
        assert_eq!(stored.revision, live.revision);
        assert_eq!(stored.status, JobStatus::Extracting);
        assert_eq!(stored.attempt, 1);
    }

    #[test]
    fn forced_run_takes_over_live_job() {
        let harness = Harness::new();
        leave_mid_phase(&harness, "live2");

        let result = processor(&harness)
            .with_force(true)
            .process_job("live2", None, None);
        assert!(!result.success);

        // No input video, so the new attempt fails in its first phase
        let stored = harness.store.load("live2").unwrap();
        assert_eq!(stored.attempt, 2);
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.failed_phase, Some(Phase::Extract));
    }

    #[test]
    fn abort_marks_live_job_failed() {
        let harness = Harness::new();
        upload(&harness, "j6", None);

        let aborted = abort_job(&harness.store, "j6", "operator request").unwrap();
        assert_eq!(aborted.status, JobStatus::Failed);
        assert_eq!(aborted.error_detail.as_deref(), Some("aborted: operator request"));

        // Terminal jobs are left alone
        let again = abort_job(&harness.store, "j6", "second").unwrap();
        assert_eq!(again.error_detail.as_deref(), Some("aborted: operator request"));
        assert_eq!(again.revision, aborted.revision);
    }

    #[test]
    fn pre_cancelled_run_records_failure() {
        let harness = Harness::new();
        upload(&harness, "j7", None);

        let handle = CancelHandle::new();
        handle.cancel();
        let result = processor(&harness).process_job_with_cancel("j7", None, None, Some(&handle));
        assert!(!result.success);

        let stored = harness.store.load("j7").unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert!(stored.error_detail.unwrap().contains("cancelled"));
    }
}
