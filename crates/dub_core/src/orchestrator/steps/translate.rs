//! Translate step - source transcript to target-language dubbing text.

use crate::models::{Job, Phase};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, StepOutcome};

pub struct TranslateStep;

impl TranslateStep {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineStep for TranslateStep {
    fn name(&self) -> &str {
        "Translate"
    }

    fn phase(&self) -> Phase {
        Phase::Translate
    }

    fn description(&self) -> &str {
        "Translate transcript"
    }

    fn validate_input(&self, _ctx: &Context, job: &Job) -> StepResult<()> {
        if job.transcript.is_none() {
            return Err(StepError::invalid_input("No transcript recorded"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, job: &mut Job) -> StepResult<StepOutcome> {
        let transcript = job.transcript.as_deref().unwrap_or_default();
        let translator = &ctx.services.translator;
        ctx.logger.info(&format!(
            "Backend: {} ({} -> {})",
            translator.name(),
            job.source_language,
            job.target_language
        ));

        let translated =
            translator.translate(transcript, &job.source_language, &job.target_language)?;
        ctx.logger.info(&format!(
            "Translation: {} chars (source {} chars)",
            translated.chars().count(),
            transcript.chars().count()
        ));

        job.translation = Some(translated);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, job: &Job) -> StepResult<()> {
        match job.translation.as_deref() {
            Some(text) if !text.trim().is_empty() => Ok(()),
            _ => Err(StepError::invalid_output("Translation is empty")),
        }
    }
}
