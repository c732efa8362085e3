//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.
//!
//! Credentials never live in the file. Backend sections name the
//! environment variable that holds the key instead.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::logging::LogLevel;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub paths: PathSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    /// External media tools (ffmpeg/ffprobe).
    #[serde(default)]
    pub tools: ToolSettings,

    #[serde(default)]
    pub transcription: TranscriptionSettings,

    #[serde(default)]
    pub translation: TranslationSettings,

    #[serde(default)]
    pub synthesis: SynthesisSettings,

    /// Duration synchronizer tuning.
    #[serde(default)]
    pub sync: SyncSettings,

    /// Defaults applied to uploads that omit languages.
    #[serde(default)]
    pub defaults: DefaultsSettings,
}

impl Settings {
    /// Values that parse but cannot drive a run.
    pub fn problems(&self) -> Vec<String> {
        let mut found = Vec::new();
        let sync = &self.sync;
        if !(sync.tolerance_secs > 0.0) {
            found.push(format!("sync.tolerance_secs must be positive, got {}", sync.tolerance_secs));
        }
        if !(sync.min_stage > 0.0 && sync.min_stage < 1.0 && sync.max_stage > 1.0) {
            found.push(format!(
                "sync stage bounds must satisfy 0 < min_stage < 1 < max_stage, got {}..{}",
                sync.min_stage, sync.max_stage
            ));
        }
        if self.synthesis.fallback_chunk_chars == 0 {
            found.push("synthesis.fallback_chunk_chars must be at least 1".to_string());
        }
        if self.tools.timeout_secs == 0 || self.tools.probe_timeout_secs == 0 {
            found.push("tools timeouts must be at least one second".to_string());
        }
        for (key, value) in [
            ("defaults.source_language", &self.defaults.source_language),
            ("defaults.target_language", &self.defaults.target_language),
        ] {
            if value.trim().is_empty() {
                found.push(format!("{} is empty", key));
            }
        }
        found
    }
}

/// Path configuration for the job workspace, records and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Root folder holding uploaded videos and per-job work directories.
    #[serde(default = "default_workspace_root")]
    pub workspace_root: String,

    /// Folder with one JSON record per job.
    #[serde(default = "default_jobs_folder")]
    pub jobs_folder: String,

    /// Folder for log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_workspace_root() -> String {
    "temp_uploads".to_string()
}

fn default_jobs_folder() -> String {
    "temp_uploads/jobs".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            workspace_root: default_workspace_root(),
            jobs_folder: default_jobs_folder(),
            logs_folder: default_logs_folder(),
        }
    }
}

impl PathSettings {
    pub fn workspace_root(&self) -> PathBuf {
        PathBuf::from(&self.workspace_root)
    }

    pub fn jobs_folder(&self) -> PathBuf {
        PathBuf::from(&self.jobs_folder)
    }

    pub fn logs_folder(&self) -> PathBuf {
        PathBuf::from(&self.logs_folder)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum level for job logs and the default for `RUST_LOG`.
    #[serde(default)]
    pub level: LogLevel,

    /// Write ffmpeg/ffprobe stderr only when the tool fails.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of tool output lines to show when a tool fails.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Prefix job log lines with a timestamp.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            compact: true,
            error_tail: default_error_tail(),
            show_timestamps: true,
        }
    }
}

/// External tool locations and time limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: String,

    #[serde(default = "default_ffprobe")]
    pub ffprobe_path: String,

    /// Upper bound for any ffmpeg invocation.
    #[serde(default = "default_tool_timeout")]
    pub timeout_secs: u64,

    /// Upper bound for an ffprobe invocation.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_tool_timeout() -> u64 {
    600
}

fn default_probe_timeout() -> u64 {
    30
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg(),
            ffprobe_path: default_ffprobe(),
            timeout_secs: default_tool_timeout(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

impl ToolSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// Speech recognition backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionProvider {
    /// Whisper on a synchronous inference endpoint.
    #[default]
    HuggingFace,
    /// Upload, submit, then poll.
    AssemblyAi,
}

/// Transcription client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionSettings {
    #[serde(default)]
    pub provider: TranscriptionProvider,

    /// Environment variable holding the API key. Provider default if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Base URL override. Provider default if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Per-request timeout.
    #[serde(default = "default_transcription_timeout")]
    pub timeout_secs: u64,

    /// Fixed interval between status polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Ceiling on total time spent polling.
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: u64,
}

fn default_transcription_timeout() -> u64 {
    300
}

fn default_poll_interval() -> u64 {
    3
}

fn default_max_wait() -> u64 {
    900
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            provider: TranscriptionProvider::default(),
            api_key_env: None,
            endpoint: None,
            timeout_secs: default_transcription_timeout(),
            poll_interval_secs: default_poll_interval(),
            max_wait_secs: default_max_wait(),
        }
    }
}

impl TranscriptionSettings {
    pub fn effective_endpoint(&self) -> String {
        self.endpoint.clone().unwrap_or_else(|| match self.provider {
            TranscriptionProvider::HuggingFace => {
                "https://api-inference.huggingface.co/models/openai/whisper-large-v3".to_string()
            }
            TranscriptionProvider::AssemblyAi => "https://api.assemblyai.com/v2".to_string(),
        })
    }

    pub fn effective_key_env(&self) -> String {
        self.api_key_env.clone().unwrap_or_else(|| match self.provider {
            TranscriptionProvider::HuggingFace => "HF_API_TOKEN".to_string(),
            TranscriptionProvider::AssemblyAi => "ASSEMBLYAI_API_KEY".to_string(),
        })
    }

    pub fn api_key(&self) -> Option<String> {
        read_env_key(&self.effective_key_env())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

/// Translation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    /// Cloud Translation v2 (literal, not instruction-following).
    #[default]
    Google,
    /// OpenAI-compatible chat completion with a dubbing instruction.
    Chat,
}

/// Translation client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationSettings {
    #[serde(default)]
    pub provider: TranslationProvider,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Model name for the chat provider.
    #[serde(default = "default_chat_model")]
    pub model: String,

    #[serde(default = "default_translation_timeout")]
    pub timeout_secs: u64,
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_translation_timeout() -> u64 {
    30
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            api_key_env: None,
            endpoint: None,
            model: default_chat_model(),
            timeout_secs: default_translation_timeout(),
        }
    }
}

impl TranslationSettings {
    pub fn effective_endpoint(&self) -> String {
        self.endpoint.clone().unwrap_or_else(|| match self.provider {
            TranslationProvider::Google => {
                "https://translation.googleapis.com/language/translate/v2".to_string()
            }
            TranslationProvider::Chat => "https://api.openai.com/v1".to_string(),
        })
    }

    pub fn effective_key_env(&self) -> String {
        self.api_key_env.clone().unwrap_or_else(|| match self.provider {
            TranslationProvider::Google => "GOOGLE_TRANSLATE_API_KEY".to_string(),
            TranslationProvider::Chat => "OPENAI_API_KEY".to_string(),
        })
    }

    pub fn api_key(&self) -> Option<String> {
        read_env_key(&self.effective_key_env())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Speech synthesis configuration (primary and fallback variants).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisSettings {
    /// Environment variable holding the primary provider's key.
    #[serde(default = "default_tts_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_tts_endpoint")]
    pub endpoint: String,

    /// Voice name for the primary provider (language default if unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_name: Option<String>,

    #[serde(default = "default_fallback_endpoint")]
    pub fallback_endpoint: String,

    /// Per-request character limit of the fallback endpoint.
    #[serde(default = "default_fallback_chunk_chars")]
    pub fallback_chunk_chars: usize,

    #[serde(default = "default_synthesis_timeout")]
    pub timeout_secs: u64,
}

fn default_tts_key_env() -> String {
    "GOOGLE_TTS_API_KEY".to_string()
}

fn default_tts_endpoint() -> String {
    "https://texttospeech.googleapis.com/v1/text:synthesize".to_string()
}

fn default_fallback_endpoint() -> String {
    "https://translate.google.com/translate_tts".to_string()
}

fn default_fallback_chunk_chars() -> usize {
    200
}

fn default_synthesis_timeout() -> u64 {
    60
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            api_key_env: default_tts_key_env(),
            endpoint: default_tts_endpoint(),
            voice_name: None,
            fallback_endpoint: default_fallback_endpoint(),
            fallback_chunk_chars: default_fallback_chunk_chars(),
            timeout_secs: default_synthesis_timeout(),
        }
    }
}

impl SynthesisSettings {
    pub fn api_key(&self) -> Option<String> {
        read_env_key(&self.api_key_env)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Duration synchronizer tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Maximum accepted absolute duration error in seconds.
    #[serde(default = "default_tolerance")]
    pub tolerance_secs: f64,

    /// Lower bound of a single chained tempo stage.
    #[serde(default = "default_min_stage")]
    pub min_stage: f64,

    /// Upper bound of a single chained tempo stage.
    #[serde(default = "default_max_stage")]
    pub max_stage: f64,

    /// Try the single-pass rubberband stretch before chained stages.
    #[serde(default = "default_true")]
    pub prefer_rubberband: bool,
}

fn default_tolerance() -> f64 {
    0.01
}

fn default_min_stage() -> f64 {
    0.5
}

fn default_max_stage() -> f64 {
    2.0
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            tolerance_secs: default_tolerance(),
            min_stage: default_min_stage(),
            max_stage: default_max_stage(),
            prefer_rubberband: true,
        }
    }
}

/// Defaults for uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsSettings {
    #[serde(default = "default_source_language")]
    pub source_language: String,

    #[serde(default = "default_target_language")]
    pub target_language: String,
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_target_language() -> String {
    "es".to_string()
}

impl Default for DefaultsSettings {
    fn default() -> Self {
        Self {
            source_language: default_source_language(),
            target_language: default_target_language(),
        }
    }
}

/// Read a credential from the environment, treating blank values as unset.
pub(crate) fn read_env_key(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Tools,
    Transcription,
    Translation,
    Synthesis,
    Sync,
    Defaults,
}

impl ConfigSection {
    pub const ALL: [ConfigSection; 8] = [
        ConfigSection::Paths,
        ConfigSection::Logging,
        ConfigSection::Tools,
        ConfigSection::Transcription,
        ConfigSection::Translation,
        ConfigSection::Synthesis,
        ConfigSection::Sync,
        ConfigSection::Defaults,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Tools => "tools",
            ConfigSection::Transcription => "transcription",
            ConfigSection::Translation => "translation",
            ConfigSection::Synthesis => "synthesis",
            ConfigSection::Sync => "sync",
            ConfigSection::Defaults => "defaults",
        }
    }

    /// Comment written above the section in generated files.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Workspace, job records and logs",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Tools => "ffmpeg / ffprobe locations and time limits",
            ConfigSection::Transcription => "Speech recognition backend",
            ConfigSection::Translation => "Translation backend",
            ConfigSection::Synthesis => "Speech synthesis (primary needs a key, fallback does not)",
            ConfigSection::Sync => "Duration synchronizer",
            ConfigSection::Defaults => "Defaults for uploads without languages",
        }
    }
}
