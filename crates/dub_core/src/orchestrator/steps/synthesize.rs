//! Synthesize step - voice the translation with the process-wide backend.

use crate::clients::synthesis::SPEECH_EXTENSIONS;
use crate::models::{Job, Phase};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, StepOutcome};

use super::require_output;

/// Writes `<id>_tts.<ext>`; the extension depends on the backend variant.
pub struct SynthesizeStep;

impl SynthesizeStep {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineStep for SynthesizeStep {
    fn name(&self) -> &str {
        "Synthesize"
    }

    fn phase(&self) -> Phase {
        Phase::Synthesize
    }

    fn description(&self) -> &str {
        "Synthesize speech"
    }

    fn validate_input(&self, _ctx: &Context, job: &Job) -> StepResult<()> {
        match job.translation.as_deref() {
            Some(text) if !text.trim().is_empty() => Ok(()),
            _ => Err(StepError::invalid_input("No translation to synthesize")),
        }
    }

    fn execute(&self, ctx: &Context, job: &mut Job) -> StepResult<StepOutcome> {
        let text = job.translation.as_deref().unwrap_or_default();
        let synthesizer = &ctx.services.synthesizer;
        let extension = synthesizer.file_extension();
        let output = ctx.artifact_path(&format!("tts.{extension}"));
        remove_stale_speech(ctx, extension)?;
        ctx.logger.info(&format!(
            "Provider: {} (language {})",
            synthesizer.provider(),
            job.target_language
        ));

        let path = synthesizer.synthesize(text, &job.target_language, &output)?;

        job.raw_synthesized_audio_path = Some(path);
        job.synthesis_provider = Some(synthesizer.provider());
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, job: &Job) -> StepResult<()> {
        require_output(job.raw_synthesized_audio_path.as_deref(), "synthesized audio")
    }
}

/// Drop speech left by an earlier attempt under the other backend.
fn remove_stale_speech(ctx: &Context, keep: &str) -> StepResult<()> {
    for ext in SPEECH_EXTENSIONS.iter().filter(|ext| **ext != keep) {
        let stale = ctx.artifact_path(&format!("tts.{ext}"));
        if stale.exists() {
            std::fs::remove_file(&stale)
                .map_err(|e| StepError::io_error("removing stale speech", e))?;
            ctx.logger.info(&format!("Removed stale speech {}", stale.display()));
        }
    }
    Ok(())
}
