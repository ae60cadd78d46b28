//! Job submission and inspection, independent of the HTTP layer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::jobs::{Job, JobId, JobRegistry, JobRequest, JobStatus};
use crate::pipeline::context::SVG_FILENAME;
use crate::pipeline::PipelineContext;
use crate::sanitize;
use crate::transform::ApiKey;
use crate::worker::JobLauncher;

/// URL prefix under which cached AI images are served.
pub const AI_CACHE_URL_PREFIX: &str = "/ai-cache/";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Upload is empty")]
    EmptyUpload,

    #[error("Job not found or not finished")]
    NotFound,

    #[error("Failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An uploaded image.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// What a status request sees of a job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusView {
    pub job_id: JobId,
    pub status: JobStatus,
    pub original_name: String,
    pub created_at: DateTime<Utc>,
    pub log: String,
    /// Traced document, once the job has finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub svg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_image_url: Option<String>,
    pub ai_image_cached: bool,
}

/// A finished job's G-code file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub download_name: String,
}

#[derive(Clone)]
pub struct JobService {
    launcher: JobLauncher,
    uploads_dir: PathBuf,
}

impl JobService {
    pub fn new(launcher: JobLauncher, uploads_dir: PathBuf) -> Self {
        Self {
            launcher,
            uploads_dir,
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        self.launcher.registry()
    }

    pub fn launcher(&self) -> &JobLauncher {
        &self.launcher
    }

    /// Saves the upload into a fresh job directory, registers the job and
    /// starts it. Returns as soon as the job is running.
    pub async fn submit(
        &self,
        upload: Upload,
        request: JobRequest,
        credential: Option<ApiKey>,
    ) -> Result<JobId, ServiceError> {
        if upload.bytes.is_empty() {
            return Err(ServiceError::EmptyUpload);
        }

        let id = JobId::generate();
        let work_dir = self.uploads_dir.join(id.to_string());
        tokio::fs::create_dir_all(&work_dir)
            .await
            .map_err(|source| ServiceError::Io {
                path: work_dir.clone(),
                source,
            })?;

        let input_path = work_dir.join(input_filename(&upload.filename));
        tokio::fs::write(&input_path, &upload.bytes)
            .await
            .map_err(|source| ServiceError::Io {
                path: input_path.clone(),
                source,
            })?;

        let original_name = sanitize::redact_path(Path::new(&upload.filename));
        let job = Job::new(id, original_name, &request, work_dir);
        info!(
            job_id = %id,
            filename = %job.original_name,
            use_ai = job.use_ai,
            "Job submitted"
        );

        self.registry().insert(job.clone());
        self.launcher
            .launch(PipelineContext::new(job, input_path), credential);
        Ok(id)
    }

    pub async fn status(&self, id: JobId) -> Option<JobStatusView> {
        let job = self.registry().get(id)?;

        let svg = if job.status().is_terminal() {
            tokio::fs::read_to_string(job.work_dir.join(SVG_FILENAME))
                .await
                .ok()
        } else {
            None
        };

        let ai_image = job.ai_image();
        Some(JobStatusView {
            job_id: job.id,
            status: job.status(),
            original_name: job.original_name.clone(),
            created_at: job.created_at,
            log: job.log_text(),
            svg,
            ai_image_url: ai_image
                .and_then(|image| image.filename.as_deref())
                .map(|filename| format!("{AI_CACHE_URL_PREFIX}{filename}")),
            ai_image_cached: ai_image.is_some_and(|image| image.cached),
        })
    }

    /// The G-code of a `done` job. Unknown and unfinished jobs are both
    /// `NotFound`.
    pub fn artifact(&self, id: JobId) -> Result<Artifact, ServiceError> {
        let job = self.registry().get(id).ok_or(ServiceError::NotFound)?;
        if job.status() != JobStatus::Done {
            return Err(ServiceError::NotFound);
        }
        let path = job
            .artifact_path()
            .ok_or(ServiceError::NotFound)?
            .to_path_buf();
        Ok(Artifact {
            path,
            download_name: job.download_name(),
        })
    }
}

/// `input` plus the upload's extension, if it has a plain one.
fn input_filename(original: &str) -> String {
    let ext = Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()));
    match ext {
        Some(ext) => format!("input.{}", ext.to_ascii_lowercase()),
        None => "input".to_string(),
    }
}
