//! Credentialed cloud text-to-speech (LINEAR16, base64 in JSON).

use std::path::{Path, PathBuf};

use base64::Engine;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::{SpeechBackend, SynthesisError, SynthesisResult};
use crate::clients::http::{build_client, check_status};
use crate::config::{read_env_key, SynthesisSettings};
use crate::models::SynthesisProvider;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: TextInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Serialize)]
struct TextInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_content: Option<String>,
}

pub struct CloudTts {
    client: Client,
    endpoint: String,
    key_env: String,
    voice_name: Option<String>,
}

impl CloudTts {
    pub fn new(settings: &SynthesisSettings) -> SynthesisResult<Self> {
        Ok(Self {
            client: build_client(settings.timeout())?,
            endpoint: settings.endpoint.clone(),
            key_env: settings.api_key_env.clone(),
            voice_name: settings.voice_name.clone(),
        })
    }
}

impl SpeechBackend for CloudTts {
    fn provider(&self) -> SynthesisProvider {
        SynthesisProvider::CloudTts
    }

    fn file_extension(&self) -> &'static str {
        "wav"
    }

    fn synthesize(&self, text: &str, language: &str, output: &Path) -> SynthesisResult<PathBuf> {
        if text.trim().is_empty() {
            return Err(SynthesisError::EmptyText);
        }
        let key = read_env_key(&self.key_env).ok_or_else(|| SynthesisError::MissingCredential {
            env_var: self.key_env.clone(),
        })?;

        let request = SynthesizeRequest {
            input: TextInput { text },
            voice: VoiceSelection {
                language_code: language,
                name: self.voice_name.as_deref(),
            },
            audio_config: AudioConfig {
                audio_encoding: "LINEAR16",
            },
        };
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", key.as_str())])
            .json(&request)
            .send()?;
        let parsed: SynthesizeResponse = check_status(response)?
            .json()
            .map_err(|e| SynthesisError::Decode(e.to_string()))?;

        let encoded = parsed
            .audio_content
            .filter(|c| !c.is_empty())
            .ok_or(SynthesisError::EmptyAudio)?;
        let audio = base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| SynthesisError::Decode(format!("audioContent is not base64: {}", e)))?;
        if audio.is_empty() {
            return Err(SynthesisError::EmptyAudio);
        }

        std::fs::write(output, &audio).map_err(|e| SynthesisError::io("writing speech audio", e))?;
        Ok(output.to_path_buf())
    }
}
