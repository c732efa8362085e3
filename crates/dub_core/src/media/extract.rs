//! Audio extraction for speech recognition.
//!
//! Output is always mono 16 kHz signed 16-bit PCM WAV. The full track is
//! kept: no trimming, no silence removal.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::probe::{MediaProbe, ProbeError};
use super::process::{MediaTools, ToolError};
use crate::models::Phase;

/// Sample rate expected by the recognition backends.
pub const SPEECH_SAMPLE_RATE: u32 = 16_000;

/// Bytes in a canonical PCM WAV header; anything this small holds no audio.
const WAV_HEADER_BYTES: u64 = 44;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Input video not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Input has no audio stream: {}", .0.display())]
    NoAudioStream(PathBuf),

    #[error("Input is unreadable: {0}")]
    Unreadable(#[from] ProbeError),

    #[error("Audio extraction failed: {0}")]
    Tool(#[from] ToolError),

    #[error("Extraction produced no audio: {}", .0.display())]
    EmptyOutput(PathBuf),

    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

impl ExtractionError {
    pub fn phase(&self) -> Phase {
        Phase::Extract
    }
}

pub struct AudioExtractor {
    tools: MediaTools,
}

impl AudioExtractor {
    pub fn new(tools: MediaTools) -> Self {
        Self { tools }
    }

    /// Extract the first audio stream of `video` into `output`.
    pub fn extract(&self, video: &Path, output: &Path) -> Result<PathBuf, ExtractionError> {
        if !video.is_file() {
            return Err(ExtractionError::InputNotFound(video.to_path_buf()));
        }

        let streams = MediaProbe::new(self.tools.clone()).probe_streams(video)?;
        if !streams.has_audio() {
            return Err(ExtractionError::NoAudioStream(video.to_path_buf()));
        }
        self.tools.note(&format!(
            "Source audio: {} stream(s), codec {}",
            streams.audio_streams,
            streams.audio_codec.as_deref().unwrap_or("unknown")
        ));

        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ExtractionError::Io {
                operation: "creating work directory".to_string(),
                source: e,
            })?;
        }

        let args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-i".to_string(),
            video.display().to_string(),
            "-vn".to_string(),
            "-map".to_string(),
            "0:a:0".to_string(),
            "-ac".to_string(),
            "1".to_string(),
            "-ar".to_string(),
            SPEECH_SAMPLE_RATE.to_string(),
            "-c:a".to_string(),
            "pcm_s16le".to_string(),
            output.display().to_string(),
        ];
        self.tools.ffmpeg.run(&args)?;

        let size = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
        if size <= WAV_HEADER_BYTES {
            return Err(ExtractionError::EmptyOutput(output.to_path_buf()));
        }

        Ok(output.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolSettings;
    use crate::media::test_support::{ffmpeg_available, write_silent_video, write_tone_video};
    use tempfile::tempdir;

    fn extractor() -> AudioExtractor {
        AudioExtractor::new(MediaTools::from_settings(&ToolSettings::default()))
    }

    #[test]
    fn missing_input_is_reported() {
        let dir = tempdir().unwrap();
        let err = extractor()
            .extract(&dir.path().join("absent.mp4"), &dir.path().join("out.wav"))
            .unwrap_err();
        assert!(matches!(err, ExtractionError::InputNotFound(_)));
        assert_eq!(err.phase(), Phase::Extract);
    }

    #[test]
    fn extracts_mono_16k_wav() {
        if !ffmpeg_available() {
            return;
        }
        let dir = tempdir().unwrap();
        let video = dir.path().join("input.mp4");
        write_tone_video(&video, 2.0).unwrap();

        let output = dir.path().join("work").join("audio.wav");
        let path = extractor().extract(&video, &output).unwrap();
        assert_eq!(path, output);

        let probe = MediaProbe::new(MediaTools::from_settings(&ToolSettings::default()));
        let duration = probe.probe_duration(&output).unwrap();
        assert!((duration - 2.0).abs() < 0.1);
        let streams = probe.probe_streams(&output).unwrap();
        assert_eq!(streams.audio_codec.as_deref(), Some("pcm_s16le"));
    }

    #[test]
    fn video_without_audio_fails() {
        if !ffmpeg_available() {
            return;
        }
        let dir = tempdir().unwrap();
        let video = dir.path().join("mute.mp4");
        write_silent_video(&video, 1.0).unwrap();

        let err = extractor()
            .extract(&video, &dir.path().join("audio.wav"))
            .unwrap_err();
        assert!(matches!(err, ExtractionError::NoAudioStream(_)));
    }
}
