//! Speech synthesis.
//!
//! Two variants behind one trait. Which one a process uses is decided once,
//! when the client is built: the credentialed primary if its key is set,
//! otherwise the keyless fallback. A primary request that fails is a
//! failure of the phase; there is no switch to the fallback mid-run.

mod chunking;
mod cloud_tts;
mod translate_tts;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::{SynthesisSettings, ToolSettings};
use crate::media::{MediaTools, ToolError};
use crate::models::{Phase, SynthesisProvider};

pub use chunking::split_text;
pub use cloud_tts::CloudTts;
pub use translate_tts::TranslateTts;

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("Missing credential: set {env_var}")]
    MissingCredential { env_var: String },

    #[error("Nothing to synthesize: text is empty")]
    EmptyText,

    #[error("Synthesis request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Synthesis backend returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected synthesis response: {0}")]
    Decode(String),

    #[error("Synthesis backend returned no audio")]
    EmptyAudio,

    #[error("Synthesis backend returned no audio for chunk {index}")]
    EmptyChunk { index: usize },

    #[error("Joining speech chunks failed: {0}")]
    Concat(#[from] ToolError),

    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

impl SynthesisError {
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn phase(&self) -> Phase {
        Phase::Synthesize
    }
}

impl From<(u16, String)> for SynthesisError {
    fn from((status, body): (u16, String)) -> Self {
        Self::Api { status, body }
    }
}

pub type SynthesisResult<T> = Result<T, SynthesisError>;

/// Every extension a backend may write; one job keeps at most one of them.
pub const SPEECH_EXTENSIONS: [&str; 2] = ["wav", "mp3"];

/// Turns text into a speech audio file.
pub trait SpeechBackend: Send + Sync {
    fn provider(&self) -> SynthesisProvider;

    /// Container extension of the files this backend writes.
    fn file_extension(&self) -> &'static str;

    /// Write speech for `text` in `language` to `output`.
    fn synthesize(&self, text: &str, language: &str, output: &Path) -> SynthesisResult<PathBuf>;
}

/// The synthesis variant chosen for this process.
pub enum SynthesisClient {
    Primary(CloudTts),
    Fallback(TranslateTts),
}

impl SynthesisClient {
    /// Pick the variant from credential availability.
    pub fn from_settings(settings: &SynthesisSettings, tools: &ToolSettings) -> SynthesisResult<Self> {
        if settings.api_key().is_some() {
            tracing::info!("Speech synthesis: cloud TTS ({} is set)", settings.api_key_env);
            Ok(Self::Primary(CloudTts::new(settings)?))
        } else {
            tracing::info!(
                "Speech synthesis: keyless fallback ({} is not set)",
                settings.api_key_env
            );
            Ok(Self::Fallback(TranslateTts::new(
                settings,
                MediaTools::from_settings(tools),
            )?))
        }
    }

    fn backend(&self) -> &dyn SpeechBackend {
        match self {
            Self::Primary(backend) => backend,
            Self::Fallback(backend) => backend,
        }
    }
}

impl SpeechBackend for SynthesisClient {
    fn provider(&self) -> SynthesisProvider {
        self.backend().provider()
    }

    fn file_extension(&self) -> &'static str {
        self.backend().file_extension()
    }

    fn synthesize(&self, text: &str, language: &str, output: &Path) -> SynthesisResult<PathBuf> {
        self.backend().synthesize(text, language, output)
    }
}
