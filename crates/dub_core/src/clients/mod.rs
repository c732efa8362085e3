//! HTTP clients for the recognition, translation and synthesis backends.
//!
//! All calls are blocking and bounded by a client-level timeout. API keys
//! are read from the environment on each call, so a missing key surfaces
//! as a `MissingCredential` error of the phase that needed it.

mod http;
pub mod synthesis;
mod transcription;
mod translation;

pub use http::build_client;
pub use synthesis::{SpeechBackend, SynthesisClient, SynthesisError, SynthesisResult};
pub use transcription::{
    build_transcriber, AssemblyAiTranscriber, HuggingFaceTranscriber, Transcriber,
    TranscriptionError, TranscriptionResult,
};
pub use translation::{
    build_translator, dubbing_instruction, ChatTranslator, GoogleTranslator, TranslationError,
    TranslationResult, Translator,
};
