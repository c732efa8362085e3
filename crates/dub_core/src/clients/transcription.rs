//! Speech recognition clients.
//!
//! Both backends block until a transcript is available or a bounded wait
//! runs out. Empty text is a valid transcript (silent input).

use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use super::http::{build_client, check_status};
use crate::config::{read_env_key, TranscriptionProvider, TranscriptionSettings};
use crate::models::Phase;

#[derive(Error, Debug)]
pub enum TranscriptionError {
    #[error("Missing credential: set {env_var}")]
    MissingCredential { env_var: String },

    #[error("Failed to read audio {}: {source}", path.display())]
    ReadAudio {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transcription request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transcription backend returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Transcription backend reported an error: {0}")]
    Backend(String),

    #[error("Unexpected transcription response: {0}")]
    Decode(String),

    #[error("Transcript not ready after {}s", waited.as_secs())]
    TimedOut { waited: Duration },
}

impl TranscriptionError {
    pub fn phase(&self) -> Phase {
        Phase::Transcribe
    }
}

impl From<(u16, String)> for TranscriptionError {
    fn from((status, body): (u16, String)) -> Self {
        Self::Api { status, body }
    }
}

pub type TranscriptionResult<T> = Result<T, TranscriptionError>;

/// Turns speech audio into text.
pub trait Transcriber: Send + Sync {
    fn name(&self) -> &'static str;

    fn transcribe(&self, audio: &Path, source_language: &str) -> TranscriptionResult<String>;
}

/// Build the backend named in the config.
pub fn build_transcriber(settings: &TranscriptionSettings) -> TranscriptionResult<Box<dyn Transcriber>> {
    Ok(match settings.provider {
        TranscriptionProvider::HuggingFace => Box::new(HuggingFaceTranscriber::new(settings)?),
        TranscriptionProvider::AssemblyAi => Box::new(AssemblyAiTranscriber::new(settings)?),
    })
}

fn require_key(env_var: &str) -> TranscriptionResult<String> {
    read_env_key(env_var).ok_or_else(|| TranscriptionError::MissingCredential {
        env_var: env_var.to_string(),
    })
}

fn read_audio(path: &Path) -> TranscriptionResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| TranscriptionError::ReadAudio {
        path: path.to_path_buf(),
        source: e,
    })
}

#[derive(Deserialize)]
struct WhisperResponse {
    text: Option<String>,
    error: Option<String>,
}

/// Whisper on a synchronous inference endpoint: raw WAV in, `{text}` out.
pub struct HuggingFaceTranscriber {
    client: Client,
    endpoint: String,
    key_env: String,
}

impl HuggingFaceTranscriber {
    pub fn new(settings: &TranscriptionSettings) -> TranscriptionResult<Self> {
        Ok(Self {
            client: build_client(settings.timeout())?,
            endpoint: settings.effective_endpoint(),
            key_env: settings.effective_key_env(),
        })
    }
}

impl Transcriber for HuggingFaceTranscriber {
    fn name(&self) -> &'static str {
        "huggingface"
    }

    /// The model detects the spoken language itself.
    fn transcribe(&self, audio: &Path, source_language: &str) -> TranscriptionResult<String> {
        let key = require_key(&self.key_env)?;
        let bytes = read_audio(audio)?;
        tracing::debug!(
            "Whisper request: {} bytes, language hint {}",
            bytes.len(),
            source_language
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(key)
            .header(CONTENT_TYPE, "audio/wav")
            .body(bytes)
            .send()?;
        let parsed: WhisperResponse = check_status(response)?.json()?;

        if let Some(error) = parsed.error {
            return Err(TranscriptionError::Backend(error));
        }
        parsed
            .text
            .map(|t| t.trim().to_string())
            .ok_or_else(|| TranscriptionError::Decode("response has no 'text' field".to_string()))
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Deserialize)]
struct TranscriptStatus {
    id: String,
    status: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Upload, submit, then poll at a fixed interval until done.
pub struct AssemblyAiTranscriber {
    client: Client,
    base_url: String,
    key_env: String,
    poll_interval: Duration,
    max_wait: Duration,
}

impl AssemblyAiTranscriber {
    pub fn new(settings: &TranscriptionSettings) -> TranscriptionResult<Self> {
        Ok(Self {
            client: build_client(settings.timeout())?,
            base_url: settings.effective_endpoint().trim_end_matches('/').to_string(),
            key_env: settings.effective_key_env(),
            poll_interval: settings.poll_interval(),
            max_wait: settings.max_wait(),
        })
    }

    fn upload(&self, key: &str, bytes: Vec<u8>) -> TranscriptionResult<String> {
        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .header("authorization", key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()?;
        let parsed: UploadResponse = check_status(response)?.json()?;
        Ok(parsed.upload_url)
    }

    fn submit(&self, key: &str, audio_url: &str, language: &str) -> TranscriptionResult<String> {
        let response = self
            .client
            .post(format!("{}/transcript", self.base_url))
            .header("authorization", key)
            .json(&json!({ "audio_url": audio_url, "language_code": language }))
            .send()?;
        let parsed: TranscriptStatus = check_status(response)?.json()?;
        if parsed.status == "error" {
            return Err(TranscriptionError::Backend(
                parsed.error.unwrap_or_else(|| "submission rejected".to_string()),
            ));
        }
        Ok(parsed.id)
    }

    fn poll(&self, key: &str, id: &str) -> TranscriptionResult<String> {
        let started = Instant::now();
        loop {
            let response = self
                .client
                .get(format!("{}/transcript/{}", self.base_url, id))
                .header("authorization", key)
                .send()?;
            let parsed: TranscriptStatus = check_status(response)?.json()?;

            match parsed.status.as_str() {
                "completed" => return Ok(parsed.text.unwrap_or_default().trim().to_string()),
                "error" => {
                    return Err(TranscriptionError::Backend(
                        parsed.error.unwrap_or_else(|| "unknown error".to_string()),
                    ))
                }
                other => tracing::debug!("Transcript {} is {}", id, other),
            }

            if started.elapsed() + self.poll_interval > self.max_wait {
                return Err(TranscriptionError::TimedOut {
                    waited: started.elapsed(),
                });
            }
            thread::sleep(self.poll_interval);
        }
    }
}

impl Transcriber for AssemblyAiTranscriber {
    fn name(&self) -> &'static str {
        "assemblyai"
    }

    fn transcribe(&self, audio: &Path, source_language: &str) -> TranscriptionResult<String> {
        let key = require_key(&self.key_env)?;
        let bytes = read_audio(audio)?;

        let audio_url = self.upload(&key, bytes)?;
        let id = self.submit(&key, &audio_url, source_language)?;
        tracing::info!("Submitted transcript {}", id);
        self.poll(&key, &id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::http::fake_server::{CannedResponse, FakeServer};
    use tempfile::tempdir;

    fn audio_file(dir: &Path) -> PathBuf {
        let path = dir.join("audio.wav");
        std::fs::write(&path, b"RIFF....WAVEfmt fake").unwrap();
        path
    }

    fn settings(
        provider: TranscriptionProvider,
        endpoint: String,
        key_env: &str,
    ) -> TranscriptionSettings {
        TranscriptionSettings {
            provider,
            api_key_env: Some(key_env.to_string()),
            endpoint: Some(endpoint),
            timeout_secs: 5,
            poll_interval_secs: 0,
            max_wait_secs: 5,
        }
    }

    #[test]
    fn huggingface_posts_raw_audio_with_bearer() {
        std::env::set_var("DUB_TEST_HF_OK", "hf-secret");
        let server = FakeServer::start(vec![CannedResponse::json(200, r#"{"text":"  hello world "}"#)]);
        let dir = tempdir().unwrap();

        let client = build_transcriber(&settings(
            TranscriptionProvider::HuggingFace,
            server.url("/whisper"),
            "DUB_TEST_HF_OK",
        ))
        .unwrap();
        let text = client.transcribe(&audio_file(dir.path()), "en").unwrap();
        assert_eq!(text, "hello world");

        let requests = server.finish();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].target, "/whisper");
        assert_eq!(requests[0].header("authorization"), Some("Bearer hf-secret"));
        assert_eq!(requests[0].header("content-type"), Some("audio/wav"));
        assert_eq!(requests[0].body, b"RIFF....WAVEfmt fake");
    }

    #[test]
    fn huggingface_empty_text_is_success() {
        std::env::set_var("DUB_TEST_HF_EMPTY", "k");
        let server = FakeServer::start(vec![CannedResponse::json(200, r#"{"text":"   "}"#)]);
        let dir = tempdir().unwrap();

        let client = HuggingFaceTranscriber::new(&settings(
            TranscriptionProvider::HuggingFace,
            server.url("/"),
            "DUB_TEST_HF_EMPTY",
        ))
        .unwrap();
        assert_eq!(client.transcribe(&audio_file(dir.path()), "en").unwrap(), "");
        server.finish();
    }

    #[test]
    fn huggingface_error_body_is_backend_error() {
        std::env::set_var("DUB_TEST_HF_ERR", "k");
        let server = FakeServer::start(vec![
            CannedResponse::json(200, r#"{"error":"model overloaded"}"#),
            CannedResponse::json(503, r#"{"error":"loading"}"#),
        ]);
        let dir = tempdir().unwrap();
        let audio = audio_file(dir.path());

        let client = HuggingFaceTranscriber::new(&settings(
            TranscriptionProvider::HuggingFace,
            server.url("/"),
            "DUB_TEST_HF_ERR",
        ))
        .unwrap();

        let err = client.transcribe(&audio, "en").unwrap_err();
        assert!(matches!(err, TranscriptionError::Backend(ref m) if m == "model overloaded"));

        let err = client.transcribe(&audio, "en").unwrap_err();
        assert!(matches!(err, TranscriptionError::Api { status: 503, .. }));
        server.finish();
    }

    #[test]
    fn missing_key_fails_without_request() {
        let dir = tempdir().unwrap();
        let client = HuggingFaceTranscriber::new(&settings(
            TranscriptionProvider::HuggingFace,
            "http://127.0.0.1:9".to_string(),
            "DUB_TEST_HF_NEVER_SET",
        ))
        .unwrap();

        let err = client.transcribe(&audio_file(dir.path()), "en").unwrap_err();
        assert!(matches!(
            err,
            TranscriptionError::MissingCredential { ref env_var } if env_var == "DUB_TEST_HF_NEVER_SET"
        ));
        assert_eq!(err.phase(), Phase::Transcribe);
    }

    #[test]
    fn assemblyai_uploads_submits_and_polls() {
        std::env::set_var("DUB_TEST_AAI_OK", "aai-key");
        let server = FakeServer::start(vec![
            CannedResponse::json(200, r#"{"upload_url":"https://cdn.example/a"}"#),
            CannedResponse::json(200, r#"{"id":"t1","status":"queued"}"#),
            CannedResponse::json(200, r#"{"id":"t1","status":"processing"}"#),
            CannedResponse::json(200, r#"{"id":"t1","status":"completed","text":"hola"}"#),
        ]);
        let dir = tempdir().unwrap();

        let client = build_transcriber(&settings(
            TranscriptionProvider::AssemblyAi,
            server.url(""),
            "DUB_TEST_AAI_OK",
        ))
        .unwrap();
        assert_eq!(client.name(), "assemblyai");
        assert_eq!(client.transcribe(&audio_file(dir.path()), "es").unwrap(), "hola");

        let requests = server.finish();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[0].target, "/upload");
        assert_eq!(requests[0].header("authorization"), Some("aai-key"));
        assert_eq!(requests[1].target, "/transcript");
        let submitted = requests[1].body_json();
        assert_eq!(submitted["audio_url"], "https://cdn.example/a");
        assert_eq!(submitted["language_code"], "es");
        assert_eq!(requests[2].method, "GET");
        assert_eq!(requests[2].target, "/transcript/t1");
    }

    #[test]
    fn assemblyai_error_status_is_terminal() {
        std::env::set_var("DUB_TEST_AAI_ERR", "k");
        let server = FakeServer::start(vec![
            CannedResponse::json(200, r#"{"upload_url":"u"}"#),
            CannedResponse::json(200, r#"{"id":"t2","status":"queued"}"#),
            CannedResponse::json(200, r#"{"id":"t2","status":"error","error":"bad audio"}"#),
        ]);
        let dir = tempdir().unwrap();

        let client = AssemblyAiTranscriber::new(&settings(
            TranscriptionProvider::AssemblyAi,
            server.url(""),
            "DUB_TEST_AAI_ERR",
        ))
        .unwrap();
        let err = client.transcribe(&audio_file(dir.path()), "en").unwrap_err();
        assert!(matches!(err, TranscriptionError::Backend(ref m) if m == "bad audio"));
        server.finish();
    }

    #[test]
    fn assemblyai_gives_up_at_ceiling() {
        std::env::set_var("DUB_TEST_AAI_SLOW", "k");
        let server = FakeServer::start(vec![
            CannedResponse::json(200, r#"{"upload_url":"u"}"#),
            CannedResponse::json(200, r#"{"id":"t3","status":"queued"}"#),
            CannedResponse::json(200, r#"{"id":"t3","status":"processing"}"#),
        ]);
        let dir = tempdir().unwrap();

        let mut config = settings(
            TranscriptionProvider::AssemblyAi,
            server.url(""),
            "DUB_TEST_AAI_SLOW",
        );
        config.poll_interval_secs = 1;
        config.max_wait_secs = 0;
        let client = AssemblyAiTranscriber::new(&config).unwrap();

        let err = client.transcribe(&audio_file(dir.path()), "en").unwrap_err();
        assert!(matches!(err, TranscriptionError::TimedOut { .. }));
        assert_eq!(server.finish().len(), 3);
    }
}
