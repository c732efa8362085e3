//! Translation clients.

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use super::http::{build_client, check_status};
use crate::config::{read_env_key, TranslationProvider, TranslationSettings};
use crate::models::Phase;

#[derive(Error, Debug)]
pub enum TranslationError {
    #[error("Missing credential: set {env_var}")]
    MissingCredential { env_var: String },

    #[error("Translation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Translation backend returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected translation response: {0}")]
    Decode(String),

    #[error("empty result")]
    EmptyResult,
}

impl TranslationError {
    pub fn phase(&self) -> Phase {
        Phase::Translate
    }
}

impl From<(u16, String)> for TranslationError {
    fn from((status, body): (u16, String)) -> Self {
        Self::Api { status, body }
    }
}

pub type TranslationResult<T> = Result<T, TranslationError>;

/// Translates transcript text for re-voicing.
pub trait Translator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Never returns empty text: an empty translation is
    /// [`TranslationError::EmptyResult`].
    fn translate(&self, text: &str, source: &str, target: &str) -> TranslationResult<String>;
}

pub fn build_translator(settings: &TranslationSettings) -> TranslationResult<Box<dyn Translator>> {
    Ok(match settings.provider {
        TranslationProvider::Google => Box::new(GoogleTranslator::new(settings)?),
        TranslationProvider::Chat => Box::new(ChatTranslator::new(settings)?),
    })
}

fn require_key(env_var: &str) -> TranslationResult<String> {
    read_env_key(env_var).ok_or_else(|| TranslationError::MissingCredential {
        env_var: env_var.to_string(),
    })
}

fn non_empty(text: String) -> TranslationResult<String> {
    let text = text.trim();
    if text.is_empty() {
        Err(TranslationError::EmptyResult)
    } else {
        Ok(text.to_string())
    }
}

/// Instruction given to chat models so the output can be voiced over the
/// original timing.
pub fn dubbing_instruction(source: &str, target: &str) -> String {
    format!(
        "You translate spoken transcripts from {source} to {target} for voice dubbing. \
         Keep the sentence order and sentence boundaries of the input. \
         Keep each sentence close to the original length so it can be spoken in the same time, \
         and prefer natural spoken phrasing over literal wording. \
         Reply with the translated text only."
    )
}

#[derive(Deserialize)]
struct GoogleResponse {
    data: GoogleData,
}

#[derive(Deserialize)]
struct GoogleData {
    translations: Vec<GoogleTranslation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleTranslation {
    translated_text: String,
}

/// Cloud Translation v2. Literal translation, no length guidance.
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
    key_env: String,
}

impl GoogleTranslator {
    pub fn new(settings: &TranslationSettings) -> TranslationResult<Self> {
        Ok(Self {
            client: build_client(settings.timeout())?,
            endpoint: settings.effective_endpoint(),
            key_env: settings.effective_key_env(),
        })
    }
}

impl Translator for GoogleTranslator {
    fn name(&self) -> &'static str {
        "google"
    }

    fn translate(&self, text: &str, source: &str, target: &str) -> TranslationResult<String> {
        if text.trim().is_empty() {
            return Err(TranslationError::EmptyResult);
        }
        let key = require_key(&self.key_env)?;

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", key.as_str())])
            .json(&json!({
                "q": text,
                "source": source,
                "target": target,
                "format": "text",
            }))
            .send()?;
        let parsed: GoogleResponse = check_status(response)?
            .json()
            .map_err(|e| TranslationError::Decode(e.to_string()))?;

        let first = parsed
            .data
            .translations
            .into_iter()
            .next()
            .ok_or_else(|| TranslationError::Decode("no translations returned".to_string()))?;
        non_empty(first.translated_text)
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completion with a dubbing instruction.
pub struct ChatTranslator {
    client: Client,
    base_url: String,
    key_env: String,
    model: String,
}

impl ChatTranslator {
    pub fn new(settings: &TranslationSettings) -> TranslationResult<Self> {
        Ok(Self {
            client: build_client(settings.timeout())?,
            base_url: settings.effective_endpoint().trim_end_matches('/').to_string(),
            key_env: settings.effective_key_env(),
            model: settings.model.clone(),
        })
    }
}

impl Translator for ChatTranslator {
    fn name(&self) -> &'static str {
        "chat"
    }

    fn translate(&self, text: &str, source: &str, target: &str) -> TranslationResult<String> {
        if text.trim().is_empty() {
            return Err(TranslationError::EmptyResult);
        }
        let key = require_key(&self.key_env)?;

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(key)
            .json(&json!({
                "model": self.model,
                "temperature": 0.3,
                "messages": [
                    { "role": "system", "content": dubbing_instruction(source, target) },
                    { "role": "user", "content": text },
                ],
            }))
            .send()?;
        let parsed: ChatResponse = check_status(response)?
            .json()
            .map_err(|e| TranslationError::Decode(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        non_empty(content)
    }
}
