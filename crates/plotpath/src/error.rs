use std::path::PathBuf;

use thiserror::Error;

/// Startup-level failures: anything that prevents the service from
/// coming up. Per-job failures never surface here.
#[derive(Error, Debug)]
pub enum PlotpathError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] crate::cache::CacheError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Transform client error: {0}")]
    Transform(#[from] crate::transform::TransformError),

    #[error("Failed to prepare data directory '{path}': {source}")]
    DataDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Server(#[source] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

pub type Result<T> = std::result::Result<T, PlotpathError>;
