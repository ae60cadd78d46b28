use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use super::JobRequest;

static LAST_ID: AtomicU64 = AtomicU64::new(0);

/// Job identifier: wall-clock nanoseconds at creation, strictly increasing
/// within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl JobId {
    pub fn generate() -> Self {
        let now = Utc::now()
            .timestamp_nanos_opt()
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(0);
        let mut candidate = now;
        let _ = LAST_ID.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            candidate = now.max(last + 1);
            Some(candidate)
        });
        JobId(candidate)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serialized as a string: the value does not fit a JSON double.
impl Serialize for JobId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(JobId)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Done,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Processing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The transformed image a job worked from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiImage {
    /// Cache blob name; `None` when the result could not be cached.
    pub filename: Option<String>,
    pub cached: bool,
}

/// One conversion job.
///
/// Status only moves forward (`processing` to `done` or `error`), the
/// artifact path is present exactly when the job is `done`, and the log is
/// append-only.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub original_name: String,
    pub max_width: f64,
    pub max_height: f64,
    pub tool_on: String,
    pub tool_off: String,
    pub use_ai: bool,
    pub prompt: String,
    pub work_dir: PathBuf,
    pub created_at: DateTime<Utc>,
    status: JobStatus,
    log: Vec<String>,
    artifact_path: Option<PathBuf>,
    ai_image: Option<AiImage>,
}

impl Job {
    pub fn new(
        id: JobId,
        original_name: impl Into<String>,
        request: &JobRequest,
        work_dir: PathBuf,
    ) -> Self {
        Self {
            id,
            original_name: original_name.into(),
            max_width: request.max_width,
            max_height: request.max_height,
            tool_on: request.tool_on.clone(),
            tool_off: request.tool_off.clone(),
            use_ai: request.use_ai,
            prompt: request.prompt.clone(),
            work_dir,
            created_at: Utc::now(),
            status: JobStatus::Processing,
            log: Vec::new(),
            artifact_path: None,
            ai_image: None,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn log_lines(&self) -> &[String] {
        &self.log
    }

    /// The log as one newline-terminated text.
    pub fn log_text(&self) -> String {
        let mut text = String::new();
        for line in &self.log {
            text.push_str(line);
            if !line.ends_with('\n') {
                text.push('\n');
            }
        }
        text
    }

    pub fn artifact_path(&self) -> Option<&Path> {
        self.artifact_path.as_deref()
    }

    pub fn ai_image(&self) -> Option<&AiImage> {
        self.ai_image.as_ref()
    }

    pub fn append_log(&mut self, line: impl Into<String>) {
        self.log.push(line.into());
    }

    pub fn set_ai_image(&mut self, image: AiImage) {
        self.ai_image = Some(image);
    }

    /// `processing -> done`. Returns false if the job had already finished.
    pub fn complete(&mut self, artifact: PathBuf) -> bool {
        if self.status.is_terminal() {
            tracing::warn!(job_id = %self.id, status = %self.status, "Ignoring completion of finished job");
            return false;
        }
        self.status = JobStatus::Done;
        self.artifact_path = Some(artifact);
        true
    }

    /// `processing -> error`. Returns false if the job had already finished.
    pub fn fail(&mut self) -> bool {
        if self.status.is_terminal() {
            tracing::warn!(job_id = %self.id, status = %self.status, "Ignoring failure of finished job");
            return false;
        }
        self.status = JobStatus::Error;
        true
    }

    /// File name offered for the artifact download.
    pub fn download_name(&self) -> String {
        let stem = Path::new(&self.original_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "output".to_string());
        format!("{stem}.gcode")
    }
}
