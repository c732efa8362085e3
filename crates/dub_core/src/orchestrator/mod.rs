//! Pipeline orchestrator for dubbing jobs.
//!
//! A job runs as a sequence of steps. Before each step the job's status
//! is written to the store; after it, the step's artifacts. Any failure
//! leaves the job `failed` with a message, and nothing is retried.
//!
//! # Architecture
//!
//! ```text
//! DubbingProcessor
//!     └── Pipeline
//!         ├── Step: Extract     → <id>_audio.wav
//!         ├── Step: Transcribe  → transcript
//!         ├── Step: Translate   → translation
//!         ├── Step: Synthesize  → <id>_tts.<wav|mp3>
//!         ├── Step: Sync        → <id>_adjusted.wav
//!         └── Step: Mux         → <id>_dubbed.mp4
//! ```
//!
//! # Example
//!
//! ```ignore
//! use dub_core::orchestrator::{DubbingProcessor, Services};
//!
//! let services = Arc::new(Services::from_settings(&settings)?);
//! let processor = DubbingProcessor::new(settings, store, services);
//! let result = processor.process_job(&job_id, None, None);
//! println!("Completed: {:?}", result.steps_completed);
//! ```

mod errors;
mod pipeline;
mod processor;
mod runner;
mod step;
pub mod steps;
mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use errors::{PipelineError, PipelineResult, StepError, StepResult};
pub use pipeline::{CancelHandle, Pipeline, PipelineRunResult};
pub use processor::{abort_job, DubbingProcessor, JobResult};
pub use runner::JobRunner;
pub use step::PipelineStep;
pub use steps::{ExtractStep, MuxStep, SyncStep, SynthesizeStep, TranscribeStep, TranslateStep};
pub use types::{Context, ProgressCallback, Services, ServicesError, StepOutcome};

/// Create the dubbing pipeline with all steps in order.
pub fn create_dubbing_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(ExtractStep::new())
        .with_step(TranscribeStep::new())
        .with_step(TranslateStep::new())
        .with_step(SynthesizeStep::new())
        .with_step(SyncStep::new())
        .with_step(MuxStep::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_steps_follow_the_data_flow() {
        let pipeline = create_dubbing_pipeline();
        assert_eq!(
            pipeline.step_names(),
            vec!["Extract", "Transcribe", "Translate", "Synthesize", "Sync", "Mux"]
        );
    }
}
