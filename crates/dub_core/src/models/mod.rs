//! Data models for the dubbing pipeline.
//!
//! - Enums for job status, pipeline phases, providers and sync methods
//! - The persisted `Job` record and its lifecycle rules

mod enums;
mod job;

pub use enums::{JobStatus, Phase, SyncMethod, SynthesisProvider};
pub use job::{Job, TransitionError};
