//! Final remux: original video stream plus the dubbed audio.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::probe::{MediaProbe, ProbeError};
use super::process::{MediaTools, ToolError};
use crate::models::Phase;

#[derive(Error, Debug)]
pub enum MuxError {
    #[error("Video input not found: {}", .0.display())]
    VideoNotFound(PathBuf),

    #[error("Audio input not found: {}", .0.display())]
    AudioNotFound(PathBuf),

    #[error("Video input has no video stream: {}", .0.display())]
    NoVideoStream(PathBuf),

    #[error("Could not inspect inputs: {0}")]
    Probe(#[from] ProbeError),

    #[error("Mux failed: {0}")]
    Tool(#[from] ToolError),

    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

impl MuxError {
    pub fn phase(&self) -> Phase {
        Phase::Mux
    }
}

pub struct Muxer {
    tools: MediaTools,
}

impl Muxer {
    pub fn new(tools: MediaTools) -> Self {
        Self { tools }
    }

    /// Write `output` with the first video stream of `video` copied and the
    /// first audio stream of `audio` encoded to AAC. Original audio is
    /// dropped.
    ///
    /// ffmpeg writes to a partial file that is renamed into place only on
    /// success, so `output` never holds a truncated result.
    pub fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<PathBuf, MuxError> {
        if !video.is_file() {
            return Err(MuxError::VideoNotFound(video.to_path_buf()));
        }
        if !audio.is_file() {
            return Err(MuxError::AudioNotFound(audio.to_path_buf()));
        }

        let streams = MediaProbe::new(self.tools.clone()).probe_streams(video)?;
        if !streams.has_video() {
            return Err(MuxError::NoVideoStream(video.to_path_buf()));
        }

        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent).map_err(|e| MuxError::Io {
                operation: "creating output directory".to_string(),
                source: e,
            })?;
        }

        let partial = partial_path(output);
        let args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-i".to_string(),
            video.display().to_string(),
            "-i".to_string(),
            audio.display().to_string(),
            "-map".to_string(),
            "0:v:0".to_string(),
            "-map".to_string(),
            "1:a:0".to_string(),
            "-c:v".to_string(),
            "copy".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            partial.display().to_string(),
        ];

        if let Err(e) = self.tools.ffmpeg.run(&args) {
            let _ = std::fs::remove_file(&partial);
            return Err(e.into());
        }

        std::fs::rename(&partial, output).map_err(|e| MuxError::Io {
            operation: "moving muxed output into place".to_string(),
            source: e,
        })?;

        Ok(output.to_path_buf())
    }
}

/// `name.mp4` -> `name.partial.mp4`, keeping the extension so ffmpeg can
/// pick the container.
fn partial_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match output.extension() {
        Some(ext) => format!("{}.partial.{}", stem, ext.to_string_lossy()),
        None => format!("{}.partial", stem),
    };
    output.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolSettings;
    use crate::media::test_support::{ffmpeg_available, write_tone, write_tone_video};
    use tempfile::tempdir;

    fn tools() -> MediaTools {
        MediaTools::from_settings(&ToolSettings::default())
    }

    #[test]
    fn partial_name_keeps_extension() {
        assert_eq!(
            partial_path(Path::new("/w/job_dubbed.mp4")),
            PathBuf::from("/w/job_dubbed.partial.mp4")
        );
        assert_eq!(
            partial_path(Path::new("/w/out")),
            PathBuf::from("/w/out.partial")
        );
    }

    #[test]
    fn missing_audio_is_reported() {
        let dir = tempdir().unwrap();
        let video = dir.path().join("v.mp4");
        std::fs::write(&video, b"x").unwrap();
        let err = Muxer::new(tools())
            .mux(&video, &dir.path().join("absent.wav"), &dir.path().join("o.mp4"))
            .unwrap_err();
        assert!(matches!(err, MuxError::AudioNotFound(_)));
        assert_eq!(err.phase(), Phase::Mux);
    }

    #[test]
    fn replaces_audio_track() {
        if !ffmpeg_available() {
            return;
        }
        let dir = tempdir().unwrap();
        let video = dir.path().join("input.mp4");
        let audio = dir.path().join("dub.wav");
        write_tone_video(&video, 2.0).unwrap();
        write_tone(&audio, 2.0).unwrap();

        let output = dir.path().join("out").join("dubbed.mp4");
        Muxer::new(tools()).mux(&video, &audio, &output).unwrap();

        assert!(output.exists());
        assert!(!partial_path(&output).exists());
        let streams = MediaProbe::new(tools()).probe_streams(&output).unwrap();
        assert_eq!(streams.video_streams, 1);
        assert_eq!(streams.audio_streams, 1);
        assert_eq!(streams.audio_codec.as_deref(), Some("aac"));
    }

    #[test]
    fn audio_only_input_is_not_muxed() {
        if !ffmpeg_available() {
            return;
        }
        let dir = tempdir().unwrap();
        let audio = dir.path().join("dub.wav");
        write_tone(&audio, 1.0).unwrap();

        let output = dir.path().join("dubbed.mp4");
        let err = Muxer::new(tools()).mux(&audio, &audio, &output).unwrap_err();
        assert!(matches!(err, MuxError::NoVideoStream(_)));
        assert!(!output.exists());
    }
}
