//! Duration synchronization of synthesized speech.
//!
//! The stage decomposition is pure and lives in [`decompose_speed_factor`];
//! [`DurationSynchronizer`] drives ffmpeg around it.

mod stages;
mod synchronizer;

use thiserror::Error;

use crate::media::{ProbeError, ToolError};
use crate::models::Phase;

pub use stages::{decompose_speed_factor, TempoPlan};
pub use synchronizer::{
    plan_correction, within_tolerance, Correction, CorrectionPlan, DurationPair,
    DurationSynchronizer, SyncOutcome,
};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Invalid {what} duration: {value}")]
    InvalidDuration { what: &'static str, value: f64 },

    #[error("Invalid speed factor: {0}")]
    InvalidSpeedFactor(f64),

    #[error("Invalid tempo stage bounds [{min}, {max}]")]
    InvalidStageBounds { min: f64, max: f64 },

    #[error("Could not measure audio: {0}")]
    Probe(#[from] ProbeError),

    #[error("Tempo stage {index} (atempo={tempo:.4}) failed: {source}")]
    Stage {
        index: usize,
        tempo: f64,
        #[source]
        source: ToolError,
    },

    #[error("Audio correction failed: {0}")]
    Tool(#[from] ToolError),

    #[error("Result is {actual:.3}s, target {target:.3}s (tolerance {tolerance}s)")]
    OutOfTolerance {
        target: f64,
        actual: f64,
        tolerance: f64,
    },

    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn phase(&self) -> Phase {
        Phase::Sync
    }
}
