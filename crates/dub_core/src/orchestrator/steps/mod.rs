//! Pipeline step implementations.
//!
//! Each step handles one phase of the dubbing pipeline and writes its
//! artifact under a name derived from the job id.

mod extract;
mod mux;
mod synthesize;
mod sync;
mod transcribe;
mod translate;

pub use extract::ExtractStep;
pub use mux::MuxStep;
pub use synthesize::SynthesizeStep;
pub use sync::SyncStep;
pub use transcribe::TranscribeStep;
pub use translate::TranslateStep;

use std::path::Path;

use crate::orchestrator::errors::{StepError, StepResult};

/// The recorded artifact, if it is a file that is actually on disk.
fn require_file<'a>(path: Option<&'a Path>, what: &str) -> StepResult<&'a Path> {
    let path = path.ok_or_else(|| StepError::invalid_input(format!("No {} recorded", what)))?;
    if !path.is_file() {
        return Err(StepError::file_not_found(path.display().to_string()));
    }
    Ok(path)
}

/// Output check shared by the file-producing steps.
fn require_output(path: Option<&Path>, what: &str) -> StepResult<()> {
    let path = path.ok_or_else(|| StepError::invalid_output(format!("{} not recorded", what)))?;
    let size = std::fs::metadata(path)
        .map_err(|e| StepError::io_error(format!("checking {}", what), e))?
        .len();
    if size == 0 {
        return Err(StepError::invalid_output(format!(
            "{} is empty: {}",
            what,
            path.display()
        )));
    }
    Ok(())
}
