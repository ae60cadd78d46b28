use std::path::PathBuf;

use crate::jobs::{JobId, JobStatus};

/// Terminal outcome of one pipeline run.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub job_id: JobId,
    pub status: JobStatus,
    pub artifact_path: Option<PathBuf>,
    pub error: Option<String>,
}

impl JobResult {
    pub fn success(job_id: JobId, artifact_path: PathBuf) -> Self {
        Self {
            job_id,
            status: JobStatus::Done,
            artifact_path: Some(artifact_path),
            error: None,
        }
    }

    pub fn failure(job_id: JobId, error: impl Into<String>) -> Self {
        Self {
            job_id,
            status: JobStatus::Error,
            artifact_path: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Done
    }
}
