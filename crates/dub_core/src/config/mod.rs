//! Configuration management for the dubbing pipeline.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Validation on load with automatic defaults
//!
//! # Example
//!
//! ```no_run
//! use dub_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/settings.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Workspace: {}", config.settings().paths.workspace_root);
//!
//! config.settings_mut().sync.prefer_rubberband = false;
//! config.update_section(ConfigSection::Sync).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub(crate) use settings::read_env_key;
pub use settings::{
    ConfigSection, DefaultsSettings, LoggingSettings, PathSettings, Settings, SyncSettings,
    SynthesisSettings, ToolSettings, TranscriptionProvider, TranscriptionSettings,
    TranslationProvider, TranslationSettings,
};
