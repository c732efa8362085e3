//! Mux step - original picture plus the adjusted voice track.

use crate::media::Muxer;
use crate::models::{Job, Phase};
use crate::orchestrator::errors::StepResult;
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, StepOutcome};

use super::{require_file, require_output};

/// Writes `<id>_dubbed.mp4`.
pub struct MuxStep;

impl MuxStep {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineStep for MuxStep {
    fn name(&self) -> &str {
        "Mux"
    }

    fn phase(&self) -> Phase {
        Phase::Mux
    }

    fn description(&self) -> &str {
        "Merge video and dubbed audio"
    }

    fn validate_input(&self, _ctx: &Context, job: &Job) -> StepResult<()> {
        require_file(job.input_video(), "input video")?;
        require_file(job.adjusted_audio_path.as_deref(), "adjusted audio")?;
        Ok(())
    }

    fn execute(&self, ctx: &Context, job: &mut Job) -> StepResult<StepOutcome> {
        let video = require_file(job.input_video(), "input video")?;
        let audio = require_file(job.adjusted_audio_path.as_deref(), "adjusted audio")?;
        let output = ctx.artifact_path("dubbed.mp4");

        let path = Muxer::new(ctx.tools.clone()).mux(video, audio, &output)?;
        ctx.logger.info(&format!("Output: {}", path.display()));

        job.output_video_path = Some(path);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, job: &Job) -> StepResult<()> {
        require_output(job.output_video_path.as_deref(), "output video")
    }
}
