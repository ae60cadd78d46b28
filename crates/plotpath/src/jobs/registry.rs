use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{Job, JobId};

/// Every job known to this process.
///
/// The lock is held only for the map operation itself, never across an
/// await point or an external call.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobId, Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, Job>> {
        // Jobs are plain data; a panic mid-update cannot leave them torn.
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, job: Job) {
        self.lock().insert(job.id, job);
    }

    /// Snapshot of the job.
    pub fn get(&self, id: JobId) -> Option<Job> {
        self.lock().get(&id).cloned()
    }

    /// Applies `f` to the job, returning its result, or `None` for an
    /// unknown id.
    pub fn update<R>(&self, id: JobId, f: impl FnOnce(&mut Job) -> R) -> Option<R> {
        self.lock().get_mut(&id).map(f)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
