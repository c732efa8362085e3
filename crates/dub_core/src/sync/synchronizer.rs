//! Stretch synthesized speech to the original audio duration.
//!
//! Flow:
//! 1. Probe both durations, `speed_factor = target / actual`
//! 2. Stretch: single-pass rubberband, or chained bounded `atempo` stages
//!    when rubberband is disabled or its invocation fails
//! 3. Re-probe and correct the residual (pad with silence, or trim)
//! 4. Verify the result is within tolerance and move it into place
//!
//! Intermediates live in a scratch directory next to the output that is
//! removed on every exit path.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::stages::decompose_speed_factor;
use super::SyncError;
use crate::config::SyncSettings;
use crate::media::{MediaProbe, MediaTools};
use crate::models::SyncMethod;

/// Target and actual durations in seconds, both strictly positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationPair {
    pub original: f64,
    pub synthesized: f64,
}

impl DurationPair {
    pub fn new(original: f64, synthesized: f64) -> Result<Self, SyncError> {
        for (what, value) in [("original", original), ("synthesized", synthesized)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SyncError::InvalidDuration { what, value });
            }
        }
        Ok(Self {
            original,
            synthesized,
        })
    }

    /// Factor the synthesized audio must be lengthened by.
    pub fn speed_factor(&self) -> f64 {
        self.original / self.synthesized
    }

    /// Playback rate that achieves `speed_factor`.
    pub fn tempo_multiplier(&self) -> f64 {
        1.0 / self.speed_factor()
    }
}

/// Residual fix applied after stretching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correction {
    /// Already within tolerance.
    None,
    /// Silence of this many seconds appended.
    Padded(f64),
    /// Cut to target with a stream copy.
    Trimmed,
    /// Cut to target with a sample-accurate re-encode.
    TrimmedReencoded,
}

/// What the correction pass should do with a measured residual.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CorrectionPlan {
    Keep,
    /// Append this many seconds of silence.
    Pad(f64),
    /// Cut down to the target.
    Trim,
}

/// Choose the residual correction for audio of `actual` seconds.
///
/// A residual strictly inside `tolerance` is kept; a residual of exactly
/// `tolerance` is corrected.
pub fn plan_correction(target: f64, actual: f64, tolerance: f64) -> CorrectionPlan {
    let diff = target - actual;
    if within_tolerance(target, actual, tolerance) {
        CorrectionPlan::Keep
    } else if diff > 0.0 {
        CorrectionPlan::Pad(diff)
    } else {
        CorrectionPlan::Trim
    }
}

/// Whether `actual` is strictly closer to `target` than `tolerance`.
pub fn within_tolerance(target: f64, actual: f64, tolerance: f64) -> bool {
    (target - actual).abs() < tolerance
}

#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub path: PathBuf,
    pub method: SyncMethod,
    pub durations: DurationPair,
    /// Duration of the stretched audio before correction.
    pub stretched_duration: f64,
    pub correction: Correction,
    pub final_duration: f64,
}

/// Matches synthesized audio length to a target duration.
pub struct DurationSynchronizer {
    tools: MediaTools,
    probe: MediaProbe,
    settings: SyncSettings,
}

impl DurationSynchronizer {
    pub fn new(tools: MediaTools, settings: SyncSettings) -> Self {
        Self {
            probe: MediaProbe::new(tools.clone()),
            tools,
            settings,
        }
    }

    /// Produce `output` from `synthesized` with the duration of `original`.
    pub fn sync(
        &self,
        original: &Path,
        synthesized: &Path,
        output: &Path,
    ) -> Result<SyncOutcome, SyncError> {
        let durations = DurationPair::new(
            self.probe.probe_duration(original)?,
            self.probe.probe_duration(synthesized)?,
        )?;
        self.tools.note(&format!(
            "Target {:.3}s, synthesized {:.3}s, speed factor {:.4}",
            durations.original,
            durations.synthesized,
            durations.speed_factor()
        ));

        let parent = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).map_err(|e| SyncError::io("creating output directory", e))?;
        let scratch = tempfile::Builder::new()
            .prefix(".sync-")
            .tempdir_in(parent)
            .map_err(|e| SyncError::io("creating scratch directory", e))?;

        let (stretched, method) = self.stretch(synthesized, &durations, &scratch)?;
        let stretched_duration = self.probe.probe_duration(&stretched)?;
        let (corrected, correction) =
            self.correct(&stretched, stretched_duration, durations.original, &scratch)?;

        let final_duration = self.probe.probe_duration(&corrected)?;
        let error = (final_duration - durations.original).abs();
        if !within_tolerance(durations.original, final_duration, self.settings.tolerance_secs) {
            return Err(SyncError::OutOfTolerance {
                target: durations.original,
                actual: final_duration,
                tolerance: self.settings.tolerance_secs,
            });
        }

        std::fs::rename(&corrected, output)
            .map_err(|e| SyncError::io("moving synced audio into place", e))?;

        self.tools.note(&format!(
            "Synced via {} ({:?}): {:.3}s, off by {:.4}s",
            method, correction, final_duration, error
        ));

        Ok(SyncOutcome {
            path: output.to_path_buf(),
            method,
            durations,
            stretched_duration,
            correction,
            final_duration,
        })
    }

    fn stretch(
        &self,
        input: &Path,
        durations: &DurationPair,
        scratch: &TempDir,
    ) -> Result<(PathBuf, SyncMethod), SyncError> {
        if self.settings.prefer_rubberband {
            let out = scratch.path().join("rubberband.wav");
            let filter = format!("rubberband=tempo={:.6}", durations.tempo_multiplier());
            match self.run_filter(input, &filter, &out) {
                Ok(()) => return Ok((out, SyncMethod::Rubberband)),
                Err(e) => self
                    .tools
                    .warn(&format!("rubberband unavailable, using chained tempo: {}", e)),
            }
        }

        let plan = decompose_speed_factor(
            durations.speed_factor(),
            self.settings.min_stage,
            self.settings.max_stage,
        )?;
        self.tools.note(&format!("Tempo stages: {:?}", plan.stages));

        let mut current = input.to_path_buf();
        for (index, tempo) in plan.tempo_values().into_iter().enumerate() {
            let out = scratch.path().join(format!("stage_{:02}.wav", index));
            let filter = format!("atempo={:.6}", tempo);
            self.run_filter(&current, &filter, &out)
                .map_err(|source| SyncError::Stage {
                    index,
                    tempo,
                    source,
                })?;
            current = out;
        }

        Ok((current, SyncMethod::ChainedTempo))
    }

    fn correct(
        &self,
        stretched: &Path,
        actual: f64,
        target: f64,
        scratch: &TempDir,
    ) -> Result<(PathBuf, Correction), SyncError> {
        let tolerance = self.settings.tolerance_secs;
        match plan_correction(target, actual, tolerance) {
            CorrectionPlan::Keep => return Ok((stretched.to_path_buf(), Correction::None)),
            CorrectionPlan::Pad(diff) => {
                let out = scratch.path().join("padded.wav");
                self.run_filter(stretched, &format!("apad=pad_dur={:.6}", diff), &out)?;
                return Ok((out, Correction::Padded(diff)));
            }
            CorrectionPlan::Trim => {}
        }

        let copy_trimmed = scratch.path().join("trimmed.wav");
        self.tools.ffmpeg.run(&[
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-i".to_string(),
            stretched.display().to_string(),
            "-t".to_string(),
            format!("{:.6}", target),
            "-c".to_string(),
            "copy".to_string(),
            copy_trimmed.display().to_string(),
        ])?;
        let trimmed = self.probe.probe_duration(&copy_trimmed)?;
        if (trimmed - target).abs() < tolerance {
            return Ok((copy_trimmed, Correction::Trimmed));
        }

        let reencoded = scratch.path().join("trimmed_exact.wav");
        let filter = format!("atrim=end={:.6},asetpts=N/SR/TB", target);
        self.run_filter(stretched, &filter, &reencoded)?;
        Ok((reencoded, Correction::TrimmedReencoded))
    }

    /// One ffmpeg pass applying an audio filter, output as PCM WAV.
    fn run_filter(
        &self,
        input: &Path,
        filter: &str,
        output: &Path,
    ) -> Result<(), crate::media::ToolError> {
        self.tools
            .ffmpeg
            .run(&[
                "-y".to_string(),
                "-hide_banner".to_string(),
                "-i".to_string(),
                input.display().to_string(),
                "-vn".to_string(),
                "-af".to_string(),
                filter.to_string(),
                "-c:a".to_string(),
                "pcm_s16le".to_string(),
                output.display().to_string(),
            ])
            .map(|_| ())
    }
}
