//! Extract step - pulls the speech track out of the uploaded video.

use crate::media::AudioExtractor;
use crate::models::{Job, Phase};
use crate::orchestrator::errors::StepResult;
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, StepOutcome};

use super::{require_file, require_output};

/// Writes `<id>_audio.wav`, mono 16 kHz, the reference for target duration.
pub struct ExtractStep;

impl ExtractStep {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineStep for ExtractStep {
    fn name(&self) -> &str {
        "Extract"
    }

    fn phase(&self) -> Phase {
        Phase::Extract
    }

    fn description(&self) -> &str {
        "Extract speech audio"
    }

    fn validate_input(&self, _ctx: &Context, job: &Job) -> StepResult<()> {
        require_file(job.input_video(), "input video")?;
        Ok(())
    }

    fn execute(&self, ctx: &Context, job: &mut Job) -> StepResult<StepOutcome> {
        let input = require_file(job.input_video(), "input video")?.to_path_buf();
        let output = ctx.artifact_path("audio.wav");

        ctx.logger.info(&format!("Input: {}", input.display()));
        let path = AudioExtractor::new(ctx.tools.clone()).extract(&input, &output)?;

        job.extracted_audio_path = Some(path);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, job: &Job) -> StepResult<()> {
        require_output(job.extracted_audio_path.as_deref(), "extracted audio")
    }
}
