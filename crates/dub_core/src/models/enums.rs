//! Core enums used throughout the pipeline.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a dubbing job.
///
/// Variants are declared in pipeline order. A job only moves forward
/// through this list, except that any non-terminal status may jump
/// straight to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Input video persisted, nothing processed yet.
    #[default]
    Uploaded,
    Extracting,
    Transcribing,
    Translating,
    Synthesizing,
    Syncing,
    Merging,
    /// Final video written. Terminal.
    Completed,
    /// A phase failed; `error_detail` is set. Terminal.
    Failed,
}

impl JobStatus {
    /// Position in the forward pipeline order.
    fn ordinal(&self) -> u8 {
        match self {
            Self::Uploaded => 0,
            Self::Extracting => 1,
            Self::Transcribing => 2,
            Self::Translating => 3,
            Self::Synthesizing => 4,
            Self::Syncing => 5,
            Self::Merging => 6,
            Self::Completed => 7,
            Self::Failed => 8,
        }
    }

    /// Whether no further transition is allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether a runner is (or was, until it died) inside a phase.
    pub fn is_in_progress(&self) -> bool {
        !self.is_terminal() && *self != Self::Uploaded
    }

    /// Check a transition against the lifecycle rules.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == Self::Failed {
            return true;
        }
        next.ordinal() > self.ordinal()
    }

    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Extracting => "extracting",
            Self::Transcribing => "transcribing",
            Self::Translating => "translating",
            Self::Synthesizing => "synthesizing",
            Self::Syncing => "syncing",
            Self::Merging => "merging",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit of work an error can be attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Probe,
    Extract,
    Transcribe,
    Translate,
    Synthesize,
    Sync,
    Mux,
}

impl Phase {
    /// The job status that is active while this phase runs.
    ///
    /// Probing has no status of its own; it runs inside other phases.
    pub fn status(&self) -> Option<JobStatus> {
        match self {
            Phase::Probe => None,
            Phase::Extract => Some(JobStatus::Extracting),
            Phase::Transcribe => Some(JobStatus::Transcribing),
            Phase::Translate => Some(JobStatus::Translating),
            Phase::Synthesize => Some(JobStatus::Synthesizing),
            Phase::Sync => Some(JobStatus::Syncing),
            Phase::Mux => Some(JobStatus::Merging),
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Probe => write!(f, "probe"),
            Phase::Extract => write!(f, "extract"),
            Phase::Transcribe => write!(f, "transcribe"),
            Phase::Translate => write!(f, "translate"),
            Phase::Synthesize => write!(f, "synthesize"),
            Phase::Sync => write!(f, "sync"),
            Phase::Mux => write!(f, "mux"),
        }
    }
}

/// Which speech synthesis variant produced the voice track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisProvider {
    /// Credentialed cloud text-to-speech.
    CloudTts,
    /// Keyless chunked translate-TTS endpoint.
    TranslateTts,
}

impl std::fmt::Display for SynthesisProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SynthesisProvider::CloudTts => write!(f, "cloud_tts"),
            SynthesisProvider::TranslateTts => write!(f, "translate_tts"),
        }
    }
}

/// Which stretch path the duration synchronizer ended up using.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMethod {
    /// Single-pass pitch-preserving stretch.
    Rubberband,
    /// Chained bounded `atempo` stages.
    ChainedTempo,
}

impl std::fmt::Display for SyncMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMethod::Rubberband => write!(f, "rubberband"),
            SyncMethod::ChainedTempo => write!(f, "chained_tempo"),
        }
    }
}
