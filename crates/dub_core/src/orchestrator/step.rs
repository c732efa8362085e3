//! Pipeline step trait definition.
//!
//! All pipeline steps implement this trait, providing a consistent
//! interface for validation and execution.

use super::errors::StepResult;
use super::types::{Context, StepOutcome};
use crate::models::{Job, Phase};

/// Trait for pipeline steps.
///
/// Each step in the pipeline implements this trait. The pipeline runner
/// moves the job into the step's status, persists it, then calls:
///
/// 1. `validate_input` - Check preconditions before execution
/// 2. `execute` - Perform the step's work and record artifacts on the job
/// 3. `validate_output` - Verify the step produced valid output
///
/// # Example
///
/// ```ignore
/// struct TranscribeStep;
///
/// impl PipelineStep for TranscribeStep {
///     fn name(&self) -> &str { "Transcribe" }
///     fn phase(&self) -> Phase { Phase::Transcribe }
///
///     fn validate_input(&self, _ctx: &Context, job: &Job) -> StepResult<()> {
///         if job.extracted_audio_path.is_none() {
///             return Err(StepError::invalid_input("No extracted audio"));
///         }
///         Ok(())
///     }
///
///     fn execute(&self, ctx: &Context, job: &mut Job) -> StepResult<StepOutcome> {
///         job.transcript = Some(ctx.services.transcriber.transcribe(..)?);
///         Ok(StepOutcome::Success)
///     }
///
///     fn validate_output(&self, _ctx: &Context, job: &Job) -> StepResult<()> {
///         if job.transcript.is_none() {
///             return Err(StepError::invalid_output("Transcript not recorded"));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait PipelineStep: Send + Sync {
    /// Get the step name (for logging and error context).
    fn name(&self) -> &str;

    /// Phase this step runs; its status is persisted before `execute`.
    fn phase(&self) -> Phase;

    /// Validate inputs before execution.
    ///
    /// Should check that earlier steps left what this one needs.
    fn validate_input(&self, ctx: &Context, job: &Job) -> StepResult<()>;

    /// Execute the step's main work.
    ///
    /// Should perform the step's processing and record results on `job`.
    /// Use `ctx.logger` for logging and `ctx.report_progress()` for progress.
    fn execute(&self, ctx: &Context, job: &mut Job) -> StepResult<StepOutcome>;

    /// Validate outputs after execution.
    ///
    /// Called after `execute` returns `Success`.
    fn validate_output(&self, ctx: &Context, job: &Job) -> StepResult<()>;

    /// Human-readable description of what this step does.
    fn description(&self) -> &str {
        self.name()
    }
}
