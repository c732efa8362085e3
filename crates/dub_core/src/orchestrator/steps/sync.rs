//! Sync step - fit the synthesized speech to the original audio length.

use crate::models::{Job, Phase};
use crate::orchestrator::errors::StepResult;
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, StepOutcome};
use crate::sync::{Correction, DurationSynchronizer};

use super::{require_file, require_output};

pub struct SyncStep;

impl SyncStep {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineStep for SyncStep {
    fn name(&self) -> &str {
        "Sync"
    }

    fn phase(&self) -> Phase {
        Phase::Sync
    }

    fn description(&self) -> &str {
        "Synchronize duration"
    }

    fn validate_input(&self, _ctx: &Context, job: &Job) -> StepResult<()> {
        require_file(job.extracted_audio_path.as_deref(), "extracted audio")?;
        require_file(job.raw_synthesized_audio_path.as_deref(), "synthesized audio")?;
        Ok(())
    }

    fn execute(&self, ctx: &Context, job: &mut Job) -> StepResult<StepOutcome> {
        let original = require_file(job.extracted_audio_path.as_deref(), "extracted audio")?;
        let synthesized =
            require_file(job.raw_synthesized_audio_path.as_deref(), "synthesized audio")?;
        let output = ctx.artifact_path("adjusted.wav");

        let synchronizer = DurationSynchronizer::new(ctx.tools.clone(), ctx.settings.sync.clone());
        let outcome = synchronizer.sync(original, synthesized, &output)?;

        let correction = match outcome.correction {
            Correction::None => "none".to_string(),
            Correction::Padded(secs) => format!("padded {:.3}s", secs),
            Correction::Trimmed => "trimmed".to_string(),
            Correction::TrimmedReencoded => "trimmed (re-encoded)".to_string(),
        };
        ctx.logger.info(&format!(
            "Method {}, stretched {:.3}s, correction {}, final {:.3}s (target {:.3}s)",
            outcome.method,
            outcome.stretched_duration,
            correction,
            outcome.final_duration,
            outcome.durations.original
        ));

        job.adjusted_audio_path = Some(outcome.path);
        job.sync_method = Some(outcome.method);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, job: &Job) -> StepResult<()> {
        require_output(job.adjusted_audio_path.as_deref(), "adjusted audio")
    }
}
