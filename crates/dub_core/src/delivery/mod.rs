//! Transport-agnostic upload and download collaborators.
//!
//! These sit at the edges of the pipeline: an upload becomes a stored
//! `uploaded` job, and a `completed` job's video is served back with
//! byte-range support. Wiring them to HTTP is left to the caller.

mod download;
mod upload;

pub use download::{content_type_for, parse_range, prepare_download, ByteRange, Download};
pub use upload::{accept_upload, UploadRequest};

use std::path::PathBuf;

use thiserror::Error;

use crate::models::JobStatus;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Upload source not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Upload is empty: {0}")]
    EmptyUpload(PathBuf),

    #[error("Job '{id}' is not completed (status: {status})")]
    NotCompleted { id: String, status: JobStatus },

    #[error("Output video not found: {0}")]
    OutputMissing(PathBuf),

    #[error("Requested range not satisfiable for {size} bytes")]
    RangeNotSatisfiable { size: u64 },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

impl DeliveryError {
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// HTTP status a transport should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::SourceNotFound(_) | Self::EmptyUpload(_) => 400,
            Self::NotCompleted { .. } => 400,
            Self::OutputMissing(_) => 404,
            Self::RangeNotSatisfiable { .. } => 416,
            Self::Store(StoreError::NotFound(_)) => 404,
            Self::Store(StoreError::InvalidId(_)) => 400,
            Self::Store(_) | Self::Io { .. } => 500,
        }
    }
}

pub type DeliveryResult<T> = Result<T, DeliveryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_http_status() {
        assert_eq!(DeliveryError::RangeNotSatisfiable { size: 10 }.http_status(), 416);
        assert_eq!(
            DeliveryError::Store(StoreError::NotFound("x".into())).http_status(),
            404
        );
        assert_eq!(
            DeliveryError::NotCompleted {
                id: "x".into(),
                status: JobStatus::Syncing
            }
            .http_status(),
            400
        );
    }
}
