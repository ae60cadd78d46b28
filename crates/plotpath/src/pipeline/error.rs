use std::path::PathBuf;

use thiserror::Error;

use crate::tools::ToolError;
use crate::transform::TransformError;

/// Failures that end a job in `error`.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Error hashing input file: {0}")]
    Fingerprint(#[source] std::io::Error),

    #[error("AI transformation enabled but no API key provided")]
    MissingCredential,

    #[error("Error reading input image '{}': {source}", path.display())]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("AI transformation error: {0}")]
    Transform(#[from] TransformError),

    #[error("Error saving AI image: {0}")]
    SaveAiImage(#[source] std::io::Error),

    #[error("{0}")]
    Tool(#[from] ToolError),

    #[error("Background step failed: {0}")]
    Task(String),
}

/// Problems logged on the job that do not stop it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineWarning {
    CacheLookup(String),
    CacheStore(String),
    Filter(String),
}
