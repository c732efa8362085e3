//! Transcribe step - speech recognition on the extracted audio.

use crate::models::{Job, Phase};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, StepOutcome};

use super::require_file;

pub struct TranscribeStep;

impl TranscribeStep {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineStep for TranscribeStep {
    fn name(&self) -> &str {
        "Transcribe"
    }

    fn phase(&self) -> Phase {
        Phase::Transcribe
    }

    fn description(&self) -> &str {
        "Transcribe speech"
    }

    fn validate_input(&self, _ctx: &Context, job: &Job) -> StepResult<()> {
        require_file(job.extracted_audio_path.as_deref(), "extracted audio")?;
        Ok(())
    }

    fn execute(&self, ctx: &Context, job: &mut Job) -> StepResult<StepOutcome> {
        let audio = require_file(job.extracted_audio_path.as_deref(), "extracted audio")?;
        let transcriber = &ctx.services.transcriber;
        ctx.logger.info(&format!(
            "Backend: {} (language {})",
            transcriber.name(),
            job.source_language
        ));

        let text = transcriber.transcribe(audio, &job.source_language)?;
        // A blank transcript is a valid result for silent input
        if text.trim().is_empty() {
            ctx.logger.warn("Transcript is empty");
        } else {
            ctx.logger
                .info(&format!("Transcript: {} chars", text.chars().count()));
        }

        job.transcript = Some(text);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, job: &Job) -> StepResult<()> {
        if job.transcript.is_none() {
            return Err(StepError::invalid_output("Transcript not recorded"));
        }
        Ok(())
    }
}
