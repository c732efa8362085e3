//! In-process stand-ins for the remote backends, plus a scratch store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use super::types::{Context, Services};
use crate::clients::{
    SpeechBackend, SynthesisError, SynthesisResult, Transcriber, TranscriptionError,
    TranscriptionResult, TranslationError, TranslationResult, Translator,
};
use crate::config::Settings;
use crate::logging::{JobLogger, LogConfig};
use crate::media::test_support::write_tone;
use crate::models::{Job, SynthesisProvider};
use crate::store::JobStore;

pub struct FixedTranscriber(pub &'static str);

impl Transcriber for FixedTranscriber {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn transcribe(&self, audio: &Path, _source_language: &str) -> TranscriptionResult<String> {
        assert!(audio.is_file(), "transcriber got missing audio {}", audio.display());
        Ok(self.0.to_string())
    }
}

pub struct FailingTranscriber;

impl Transcriber for FailingTranscriber {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn transcribe(&self, _audio: &Path, _source_language: &str) -> TranscriptionResult<String> {
        Err(TranscriptionError::Backend("model is loading".to_string()))
    }
}

/// Prefixes the target language; blank input is an empty result.
pub struct TaggingTranslator;

impl Translator for TaggingTranslator {
    fn name(&self) -> &'static str {
        "tagging"
    }

    fn translate(&self, text: &str, _source: &str, target: &str) -> TranslationResult<String> {
        if text.trim().is_empty() {
            return Err(TranslationError::EmptyResult);
        }
        Ok(format!("[{}] {}", target, text))
    }
}

/// Writes a 16 kHz sine of fixed length through ffmpeg.
pub struct ToneSynthesizer {
    pub seconds: f64,
}

impl SpeechBackend for ToneSynthesizer {
    fn provider(&self) -> SynthesisProvider {
        SynthesisProvider::CloudTts
    }

    fn file_extension(&self) -> &'static str {
        "wav"
    }

    fn synthesize(&self, text: &str, _language: &str, output: &Path) -> SynthesisResult<PathBuf> {
        if text.trim().is_empty() {
            return Err(SynthesisError::EmptyText);
        }
        write_tone(output, self.seconds).map_err(|e| SynthesisError::io("writing tone", e))?;
        Ok(output.to_path_buf())
    }
}

pub fn mock_services(transcriber: Box<dyn Transcriber>, speech_seconds: f64) -> Services {
    Services {
        transcriber,
        translator: Box::new(TaggingTranslator),
        synthesizer: Box::new(ToneSynthesizer {
            seconds: speech_seconds,
        }),
    }
}

/// Record every artifact path so the job may complete.
pub fn fill_artifacts(job: &mut Job, work_dir: &Path) {
    job.extracted_audio_path = Some(work_dir.join("audio.wav"));
    job.raw_synthesized_audio_path = Some(work_dir.join("tts.wav"));
    job.adjusted_audio_path = Some(work_dir.join("adjusted.wav"));
    job.output_video_path = Some(work_dir.join("dubbed.mp4"));
}

/// Scratch workspace with a store and mock services.
pub struct Harness {
    pub dir: TempDir,
    pub store: Arc<JobStore>,
    pub services: Arc<Services>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_services(mock_services(Box::new(FixedTranscriber("Hello there.")), 1.0))
    }

    pub fn with_services(services: Services) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JobStore::open(dir.path().join("jobs")).unwrap());
        Self {
            dir,
            store,
            services: Arc::new(services),
        }
    }

    /// Settings rooted inside the scratch directory.
    pub fn settings(&self) -> Settings {
        let root = self.dir.path();
        let mut settings = Settings::default();
        settings.paths.workspace_root = root.join("workspace").to_string_lossy().into_owned();
        settings.paths.jobs_folder = root.join("jobs").to_string_lossy().into_owned();
        settings.paths.logs_folder = root.join("logs").to_string_lossy().into_owned();
        settings
    }

    /// Store a fresh uploaded job and build a context for it.
    pub fn context(&self, id: &str) -> (Context, Job) {
        let job = self
            .store
            .create(&Job::new(id, self.dir.path().join(format!("{id}.mp4")), "en", "es"))
            .unwrap();

        let work_dir = self.dir.path().join("workspace").join(id);
        std::fs::create_dir_all(&work_dir).unwrap();
        let logger = Arc::new(
            JobLogger::new(id, self.dir.path().join("logs"), LogConfig::default(), None).unwrap(),
        );
        let ctx = Context::new(
            self.settings(),
            id,
            work_dir,
            logger,
            Arc::clone(&self.services),
            Arc::clone(&self.store),
        );
        (ctx, job)
    }
}
