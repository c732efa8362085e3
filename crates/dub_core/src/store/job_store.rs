use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::{StoreError, StoreResult};
use crate::models::Job;

/// File-backed job store.
///
/// Writes go through a temp file and a rename so a reader never sees a
/// half-written record. `replace` compares revisions, so two writers that
/// read the same revision cannot both win.
#[derive(Debug)]
pub struct JobStore {
    dir: PathBuf,
    /// Serializes read-compare-write within this process.
    lock: Mutex<()>,
}

impl JobStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StoreError::io("creating jobs directory", e))?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `id`.
    pub fn record_path(&self, id: &str) -> StoreResult<PathBuf> {
        validate_id(id)?;
        Ok(self.dir.join(format!("{}.json", id)))
    }

    pub fn exists(&self, id: &str) -> bool {
        self.record_path(id).map(|p| p.exists()).unwrap_or(false)
    }

    /// Persist a new record at revision 1.
    pub fn create(&self, job: &Job) -> StoreResult<Job> {
        let path = self.record_path(&job.id)?;
        let _guard = self.lock.lock();
        if path.exists() {
            return Err(StoreError::AlreadyExists(job.id.clone()));
        }

        let mut stored = job.clone();
        stored.revision = 1;
        self.write(&path, &stored)?;
        tracing::debug!("Created job record {}", job.id);
        Ok(stored)
    }

    pub fn load(&self, id: &str) -> StoreResult<Job> {
        let path = self.record_path(id)?;
        let _guard = self.lock.lock();
        self.read(&path, id)
    }

    /// Replace the record if nobody else wrote since `job` was read.
    ///
    /// Returns the stored copy with its new revision.
    pub fn replace(&self, job: &Job) -> StoreResult<Job> {
        let path = self.record_path(&job.id)?;
        let _guard = self.lock.lock();

        let current = self.read(&path, &job.id)?;
        if current.revision != job.revision {
            return Err(StoreError::Conflict {
                id: job.id.clone(),
                expected: job.revision,
                found: current.revision,
            });
        }

        let mut stored = job.clone();
        stored.revision = current.revision + 1;
        self.write(&path, &stored)?;
        Ok(stored)
    }

    /// All records, oldest first. Unreadable records are skipped with a warning.
    pub fn list(&self) -> StoreResult<Vec<Job>> {
        let _guard = self.lock.lock();
        let entries = fs::read_dir(&self.dir).map_err(|e| StoreError::io("listing jobs", e))?;

        let mut jobs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io("listing jobs", e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.read(&path, id) {
                Ok(job) => jobs.push(job),
                Err(e) => tracing::warn!("Skipping job record {}: {}", path.display(), e),
            }
        }

        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(jobs)
    }

    fn read(&self, path: &Path, id: &str) -> StoreResult<Job> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()))
            }
            Err(e) => return Err(StoreError::io("reading job record", e)),
        };
        serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn write(&self, path: &Path, job: &Job) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(job).map_err(|e| StoreError::Corrupt {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let temp = path.with_extension("json.tmp");
        fs::write(&temp, json).map_err(|e| StoreError::io("writing job record", e))?;
        fs::rename(&temp, path).map_err(|e| StoreError::io("replacing job record", e))?;
        Ok(())
    }
}

/// Ids become file names, so only `[A-Za-z0-9_-]` is accepted.
fn validate_id(id: &str) -> StoreResult<()> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}
