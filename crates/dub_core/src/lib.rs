//! Dub Core - the video dubbing pipeline
//!
//! Extracts speech from a video, transcribes and translates it, voices the
//! translation, fits the new voice track to the original timing and muxes
//! it back over the original picture. No UI or transport dependencies; the
//! `dub` CLI and any server front end sit on top of this crate.

pub mod clients;
pub mod config;
pub mod delivery;
pub mod logging;
pub mod media;
pub mod models;
pub mod orchestrator;
pub mod store;
pub mod sync;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
