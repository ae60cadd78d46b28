use std::sync::Arc;

use log::{debug, error, info};
use tokio::task::JoinError;
use tokio_util::task::TaskTracker;

use crate::jobs::{JobId, JobRegistry};
use crate::pipeline::{JobResult, Pipeline, PipelineContext, RegistryProgress};
use crate::transform::ApiKey;

/// Starts pipeline runs as unattended background tasks.
///
/// Every job task in the process is spawned here, so an admission policy
/// only ever needs to be added in [`JobLauncher::launch`]. Jobs are not
/// bounded or cancelled; [`JobLauncher::shutdown`] waits for them.
#[derive(Clone)]
pub struct JobLauncher {
    pipeline: Arc<Pipeline>,
    registry: Arc<JobRegistry>,
    tracker: TaskTracker,
}

impl JobLauncher {
    pub fn new(pipeline: Arc<Pipeline>, registry: Arc<JobRegistry>) -> Self {
        Self {
            pipeline,
            registry,
            tracker: TaskTracker::new(),
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Runs the pipeline for an already registered job in the background.
    /// The credential moves into the task and is dropped when it ends.
    pub fn launch(
        &self,
        ctx: PipelineContext,
        credential: Option<ApiKey>,
    ) -> tokio::task::JoinHandle<JobResult> {
        let pipeline = Arc::clone(&self.pipeline);
        let registry = Arc::clone(&self.registry);
        let progress = RegistryProgress::new(Arc::clone(&self.registry), ctx.job.id);
        let job_id = ctx.job.id;
        debug!("Launching job {}", job_id);

        self.tracker.spawn(async move {
            // Inner task so a panic surfaces as a JoinError instead of
            // leaving the job in `processing`.
            let run = tokio::spawn(async move {
                let (result, _ctx) = pipeline.run(ctx, credential, &progress).await;
                result
            });
            let result = match run.await {
                Ok(result) => result,
                Err(e) => abort_job(&registry, job_id, &e),
            };
            log_outcome(job_id, &result);
            result
        })
    }

    /// Number of jobs still running.
    pub fn running(&self) -> usize {
        self.tracker.len()
    }

    /// Waits for every launched job to finish.
    pub async fn shutdown(&self) {
        self.tracker.close();
        if !self.tracker.is_empty() {
            info!("Waiting for {} running job(s)", self.tracker.len());
        }
        self.tracker.wait().await;
    }
}

fn abort_job(registry: &JobRegistry, job_id: JobId, err: &JoinError) -> JobResult {
    let message = if err.is_panic() {
        "Internal error: job task panicked"
    } else {
        "Internal error: job task was cancelled"
    };
    error!("Job {} aborted: {}", job_id, err);
    registry.update(job_id, |job| {
        job.append_log(format!("Error: {}", message));
        job.fail();
    });
    JobResult::failure(job_id, message)
}

fn log_outcome(job_id: JobId, result: &JobResult) {
    match &result.error {
        None => info!("Job {} finished: {}", job_id, result.status),
        Some(error) => info!("Job {} finished: {} ({})", job_id, result.status, error),
    }
}
