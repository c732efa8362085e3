//! Concurrent job execution, one OS thread per job.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use super::pipeline::CancelHandle;
use super::processor::{DubbingProcessor, JobResult};

/// Spawns jobs onto their own threads.
///
/// Jobs share nothing but the processor (settings, store and backends);
/// every artifact is keyed by job id, so concurrent jobs do not collide.
pub struct JobRunner {
    processor: Arc<DubbingProcessor>,
    /// Handles of every job started by this runner.
    cancel_handles: Mutex<Vec<(String, CancelHandle)>>,
}

impl JobRunner {
    pub fn new(processor: Arc<DubbingProcessor>) -> Self {
        Self {
            processor,
            cancel_handles: Mutex::new(Vec::new()),
        }
    }

    /// Start `job_id` on a new thread.
    pub fn spawn(&self, job_id: &str) -> std::io::Result<JoinHandle<JobResult>> {
        let processor = Arc::clone(&self.processor);
        let handle = CancelHandle::new();
        self.cancel_handles
            .lock()
            .push((job_id.to_string(), handle.clone()));

        let id = job_id.to_string();
        thread::Builder::new()
            .name(format!("dub-{}", id))
            .spawn(move || processor.process_job_with_cancel(&id, None, None, Some(&handle)))
    }

    /// Run every job concurrently and wait for all of them.
    ///
    /// Results come back in the order of `job_ids`. An id listed twice
    /// runs once; its repeats fail without touching the job.
    pub fn run_all(&self, job_ids: &[String]) -> Vec<JobResult> {
        let mut seen = HashSet::new();
        let spawned: Vec<_> = job_ids
            .iter()
            .map(|id| {
                let spawned = if seen.insert(id.as_str()) {
                    Some(self.spawn(id))
                } else {
                    None
                };
                (id.clone(), spawned)
            })
            .collect();

        spawned
            .into_iter()
            .map(|(id, spawned)| match spawned {
                Some(Ok(handle)) => handle.join().unwrap_or_else(|_| {
                    tracing::error!(job_id = %id, "Job thread panicked");
                    JobResult::failure(id, "job thread panicked")
                }),
                Some(Err(e)) => {
                    JobResult::failure(id, format!("Failed to start job thread: {}", e))
                }
                None => JobResult::failure(id, "job listed more than once in this run"),
            })
            .collect()
    }

    /// Ask every job started by this runner to stop at its next step boundary.
    pub fn cancel_all(&self) {
        for (id, handle) in self.cancel_handles.lock().iter() {
            tracing::info!(job_id = %id, "Cancelling job");
            handle.cancel();
        }
    }
}
