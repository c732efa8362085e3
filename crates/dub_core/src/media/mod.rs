//! ffmpeg/ffprobe wrappers: probing, extraction, concatenation and muxing.
//!
//! Every invocation goes through [`ToolRunner`], which enforces a
//! kill-on-deadline timeout and feeds tool output into the job log.

mod concat;
mod extract;
mod mux;
mod probe;
mod process;

pub use concat::concat_segments;
pub use extract::{AudioExtractor, ExtractionError, SPEECH_SAMPLE_RATE};
pub use mux::{MuxError, Muxer};
pub use probe::{MediaProbe, ProbeError, ProbeResult, StreamSummary};
pub use process::{MediaTools, ToolError, ToolOutput, ToolRunner};
