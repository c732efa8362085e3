//! Ordered concatenation of audio segments with the concat demuxer.
//!
//! Segments are stream-copied, so they must share codec and parameters.

use std::io::Write;
use std::path::Path;

use super::process::{MediaTools, ToolError};

/// Concatenate `segments` in order into `output` without re-encoding.
///
/// The list file is written to `list_path` and left for the caller's
/// scratch directory to clean up.
pub fn concat_segments(
    tools: &MediaTools,
    segments: &[impl AsRef<Path>],
    list_path: &Path,
    output: &Path,
) -> Result<(), ToolError> {
    let io_err = |source| ToolError::Io {
        tool: tools.ffmpeg.program().to_string(),
        source,
    };

    let mut list = std::fs::File::create(list_path).map_err(io_err)?;
    list.write_all(render_concat_list(segments).as_bytes())
        .map_err(io_err)?;
    list.sync_all().map_err(io_err)?;
    drop(list);

    let args = vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        list_path.display().to_string(),
        "-c".to_string(),
        "copy".to_string(),
        output.display().to_string(),
    ];
    tools.ffmpeg.run(&args)?;
    Ok(())
}

/// Concat demuxer list: one `file '<path>'` line per segment.
fn render_concat_list(segments: &[impl AsRef<Path>]) -> String {
    let mut out = String::new();
    for segment in segments {
        let path = segment.as_ref().display().to_string();
        out.push_str("file '");
        out.push_str(&path.replace('\'', "'\\''"));
        out.push_str("'\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolSettings;
    use crate::media::probe::MediaProbe;
    use crate::media::test_support::{
        decode_s16le, ffmpeg_available, write_silence_at, write_tone_at,
    };
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn list_quotes_paths() {
        let segments = vec![
            PathBuf::from("/tmp/a.mp3"),
            PathBuf::from("/tmp/it's.mp3"),
        ];
        let list = render_concat_list(&segments);
        assert_eq!(list, "file '/tmp/a.mp3'\nfile '/tmp/it'\\''s.mp3'\n");
    }

    #[test]
    fn preserves_total_duration_and_order() {
        if !ffmpeg_available() {
            return;
        }
        const RATE: u32 = 8_000;
        let dir = tempdir().unwrap();
        let first = dir.path().join("00.wav");
        let second = dir.path().join("01.wav");
        let third = dir.path().join("02.wav");
        write_silence_at(&first, 1.0, RATE).unwrap();
        write_tone_at(&second, 2.0, RATE).unwrap();
        write_silence_at(&third, 3.0, RATE).unwrap();

        let tools = MediaTools::from_settings(&ToolSettings::default());
        let output = dir.path().join("joined.wav");
        concat_segments(
            &tools,
            &[&first, &second, &third],
            &dir.path().join("list.txt"),
            &output,
        )
        .unwrap();

        let duration = MediaProbe::new(tools.clone()).probe_duration(&output).unwrap();
        assert!((duration - 6.0).abs() < 0.02, "duration {duration}");

        // Loud only in the middle segment
        let samples = decode_s16le(&output, RATE).unwrap();
        let rate = RATE as usize;
        let peak = |range: std::ops::Range<usize>| {
            samples[range]
                .iter()
                .map(|s| (*s as i32).abs())
                .max()
                .unwrap_or(0)
        };
        assert!(peak(100..rate - 100) < 100);
        assert!(peak(rate + 100..3 * rate - 100) > 1000);
        assert!(peak(3 * rate + 100..samples.len() - 100) < 100);
    }
}
