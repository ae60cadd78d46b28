use std::path::PathBuf;
use std::sync::Arc;

use crate::jobs::{AiImage, JobId, JobRegistry};

/// Events emitted by the pipeline while a job runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// One entry for the job's diagnostic log.
    Log(String),
    AiImage(AiImage),
    Completed { artifact_path: PathBuf },
    Failed { error: String },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Writes pipeline events into the job registry.
pub struct RegistryProgress {
    registry: Arc<JobRegistry>,
    job_id: JobId,
}

impl RegistryProgress {
    pub fn new(registry: Arc<JobRegistry>, job_id: JobId) -> Self {
        Self { registry, job_id }
    }
}

impl ProgressReporter for RegistryProgress {
    fn report(&self, event: ProgressEvent) {
        let applied = self.registry.update(self.job_id, |job| match event {
            ProgressEvent::Log(line) => job.append_log(line),
            ProgressEvent::AiImage(image) => job.set_ai_image(image),
            ProgressEvent::Completed { artifact_path } => {
                job.complete(artifact_path);
            }
            ProgressEvent::Failed { .. } => {
                job.fail();
            }
        });
        if applied.is_none() {
            tracing::warn!(job_id = %self.job_id, "Progress for unknown job dropped");
        }
    }
}
