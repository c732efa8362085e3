//! Accept a video into the workspace and register its job.

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::{DeliveryError, DeliveryResult};
use crate::config::DefaultsSettings;
use crate::models::Job;
use crate::store::JobStore;

/// A video handed over by the transport layer.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    /// Where the received bytes currently are.
    pub source: PathBuf,
    /// File name as the client sent it; its extension is kept.
    pub original_name: Option<String>,
    pub source_language: Option<String>,
    pub target_language: Option<String>,
}

impl UploadRequest {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn with_languages(
        mut self,
        source_language: Option<String>,
        target_language: Option<String>,
    ) -> Self {
        self.source_language = source_language;
        self.target_language = target_language;
        self
    }

    fn display_name(&self) -> Option<String> {
        self.original_name.clone().or_else(|| {
            self.source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        })
    }
}

/// Copy the video to `<workspace>/<id><ext>` and store an `uploaded` job.
///
/// Missing or blank languages fall back to the configured defaults. If
/// the record cannot be written the copied video is removed again.
pub fn accept_upload(
    store: &JobStore,
    workspace: &Path,
    defaults: &DefaultsSettings,
    request: UploadRequest,
) -> DeliveryResult<Job> {
    if !request.source.is_file() {
        return Err(DeliveryError::SourceNotFound(request.source));
    }

    let id = Uuid::new_v4().to_string();
    let original_name = request.display_name();
    let extension = original_name
        .as_deref()
        .and_then(|name| Path::new(name).extension())
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default();

    fs::create_dir_all(workspace).map_err(|e| DeliveryError::io("creating workspace", e))?;
    let destination = workspace.join(format!("{}{}", id, extension));
    let size = fs::copy(&request.source, &destination)
        .map_err(|e| DeliveryError::io("copying upload", e))?;
    if size == 0 {
        let _ = fs::remove_file(&destination);
        return Err(DeliveryError::EmptyUpload(request.source));
    }

    let source_language = pick_language(request.source_language, &defaults.source_language);
    let target_language = pick_language(request.target_language, &defaults.target_language);

    let mut job = Job::new(&id, &destination, source_language, target_language);
    job.original_name = original_name;
    job.size_bytes = Some(size);

    match store.create(&job) {
        Ok(stored) => {
            tracing::info!(
                job_id = %stored.id,
                size,
                "Upload stored as {}",
                destination.display()
            );
            Ok(stored)
        }
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(&destination) {
                tracing::warn!("Failed to clean up {}: {}", destination.display(), cleanup);
            }
            Err(e.into())
        }
    }
}

fn pick_language(requested: Option<String>, default: &str) -> String {
    requested
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| default.to_string())
}
