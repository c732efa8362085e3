//! Media probing using ffprobe.
//!
//! Read-only: nothing here writes to disk.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::process::{MediaTools, ToolError};
use crate::models::Phase;

/// Errors from probing a media file.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Media file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("ffprobe could not read {}: {source}", path.display())]
    Tool {
        path: PathBuf,
        #[source]
        source: ToolError,
    },

    #[error("No valid duration for {}: got '{raw}'", path.display())]
    InvalidDuration { path: PathBuf, raw: String },

    #[error("Failed to parse ffprobe output for {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

impl ProbeError {
    pub fn phase(&self) -> Phase {
        Phase::Probe
    }
}

pub type ProbeResult<T> = Result<T, ProbeError>;

/// Which kinds of streams a file carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub video_streams: usize,
    pub audio_streams: usize,
    /// Codec of the first audio stream.
    pub audio_codec: Option<String>,
}

impl StreamSummary {
    pub fn has_audio(&self) -> bool {
        self.audio_streams > 0
    }

    pub fn has_video(&self) -> bool {
        self.video_streams > 0
    }
}

#[derive(Deserialize)]
struct StreamsJson {
    #[serde(default)]
    streams: Vec<StreamJson>,
}

#[derive(Deserialize)]
struct StreamJson {
    codec_type: Option<String>,
    codec_name: Option<String>,
}

/// Duration and stream queries against ffprobe.
#[derive(Clone)]
pub struct MediaProbe {
    tools: MediaTools,
}

impl MediaProbe {
    pub fn new(tools: MediaTools) -> Self {
        Self { tools }
    }

    /// Container duration in seconds. Always strictly positive on success.
    pub fn probe_duration(&self, path: &Path) -> ProbeResult<f64> {
        ensure_exists(path)?;

        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-show_entries".to_string(),
            "format=duration".to_string(),
            "-of".to_string(),
            "default=noprint_wrappers=1:nokey=1".to_string(),
            path.display().to_string(),
        ];
        let output = self.tools.ffprobe.run(&args).map_err(|e| ProbeError::Tool {
            path: path.to_path_buf(),
            source: e,
        })?;

        let raw = output.stdout_text();
        parse_duration(&raw).ok_or_else(|| ProbeError::InvalidDuration {
            path: path.to_path_buf(),
            raw: raw.trim().to_string(),
        })
    }

    /// Count audio and video streams.
    pub fn probe_streams(&self, path: &Path) -> ProbeResult<StreamSummary> {
        ensure_exists(path)?;

        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-show_entries".to_string(),
            "stream=codec_type,codec_name".to_string(),
            "-of".to_string(),
            "json".to_string(),
            path.display().to_string(),
        ];
        let output = self.tools.ffprobe.run(&args).map_err(|e| ProbeError::Tool {
            path: path.to_path_buf(),
            source: e,
        })?;

        parse_streams(&output.stdout).map_err(|message| ProbeError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }
}

fn ensure_exists(path: &Path) -> ProbeResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ProbeError::FileNotFound(path.to_path_buf()))
    }
}

/// Parse ffprobe's bare duration output. `None` for absent or non-positive.
fn parse_duration(raw: &str) -> Option<f64> {
    let value: f64 = raw.lines().next()?.trim().parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

fn parse_streams(json: &[u8]) -> Result<StreamSummary, String> {
    let parsed: StreamsJson = serde_json::from_slice(json).map_err(|e| e.to_string())?;

    let mut summary = StreamSummary::default();
    for stream in parsed.streams {
        match stream.codec_type.as_deref() {
            Some("video") => summary.video_streams += 1,
            Some("audio") => {
                if summary.audio_codec.is_none() {
                    summary.audio_codec = stream.codec_name;
                }
                summary.audio_streams += 1;
            }
            _ => {}
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolSettings;
    use crate::media::test_support::{ffmpeg_available, write_tone};
    use tempfile::tempdir;

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration("12.345000\n"), Some(12.345));
        assert_eq!(parse_duration("N/A"), None);
        assert_eq!(parse_duration("0.000000"), None);
        assert_eq!(parse_duration("-1.5"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn parses_stream_listing() {
        let json = br#"{"streams":[
            {"codec_type":"video","codec_name":"h264"},
            {"codec_type":"audio","codec_name":"aac"},
            {"codec_type":"audio","codec_name":"ac3"},
            {"codec_type":"subtitle","codec_name":"mov_text"}
        ]}"#;
        let summary = parse_streams(json).unwrap();
        assert_eq!(summary.video_streams, 1);
        assert_eq!(summary.audio_streams, 2);
        assert_eq!(summary.audio_codec.as_deref(), Some("aac"));

        let empty = parse_streams(b"{}").unwrap();
        assert!(!empty.has_audio());
        assert!(!empty.has_video());
    }

    #[test]
    fn missing_file_fails_before_running_ffprobe() {
        let probe = MediaProbe::new(MediaTools::from_settings(&ToolSettings::default()));
        let err = probe
            .probe_duration(Path::new("/nonexistent/input.wav"))
            .unwrap_err();
        assert!(matches!(err, ProbeError::FileNotFound(_)));
        assert_eq!(err.phase(), Phase::Probe);
    }

    #[test]
    fn probes_generated_tone() {
        if !ffmpeg_available() {
            return;
        }
        let dir = tempdir().unwrap();
        let tone = dir.path().join("tone.wav");
        write_tone(&tone, 2.0).unwrap();

        let probe = MediaProbe::new(MediaTools::from_settings(&ToolSettings::default()));
        let duration = probe.probe_duration(&tone).unwrap();
        assert!((duration - 2.0).abs() < 0.01);

        let streams = probe.probe_streams(&tone).unwrap();
        assert!(streams.has_audio());
        assert!(!streams.has_video());
    }

    #[test]
    fn garbage_file_is_unreadable() {
        if !ffmpeg_available() {
            return;
        }
        let dir = tempdir().unwrap();
        let junk = dir.path().join("junk.wav");
        std::fs::write(&junk, b"not really audio").unwrap();

        let probe = MediaProbe::new(MediaTools::from_settings(&ToolSettings::default()));
        assert!(probe.probe_duration(&junk).is_err());
    }
}
