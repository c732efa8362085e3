//! Durable job records, one JSON file per job id.
//!
//! The store only reads and replaces records. Lifecycle rules live on
//! `Job`; the orchestrator is the only writer that changes status.

mod job_store;

pub use job_store::JobStore;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid job id '{0}'")]
    InvalidId(String),

    #[error("Job '{0}' not found")]
    NotFound(String),

    #[error("Job '{0}' already exists")]
    AlreadyExists(String),

    /// Another writer replaced the record since it was read.
    #[error("Job '{id}' was modified concurrently (expected revision {expected}, found {found})")]
    Conflict { id: String, expected: u64, found: u64 },

    #[error("Corrupt job record {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
