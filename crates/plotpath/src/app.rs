//! Wiring: turns a loaded [`Config`] into a running job service.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;

use crate::cache::ResultCache;
use crate::config::Config;
use crate::error::PlotpathError;
use crate::jobs::JobRegistry;
use crate::pipeline::{Pipeline, PipelineConfig};
use crate::sanitize;
use crate::service::JobService;
use crate::worker::JobLauncher;

const APP_DIR_NAME: &str = "plotpath";

/// On-disk layout below the data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    pub root: PathBuf,
    pub uploads: PathBuf,
    pub ai_cache: PathBuf,
    pub cache_index: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            uploads: root.join("uploads"),
            ai_cache: root.join("ai_cache"),
            cache_index: root.join("ai_cache.db"),
            root,
        }
    }

    /// Creates the uploads directory. The cache creates its own on open.
    pub fn create(&self) -> Result<(), PlotpathError> {
        std::fs::create_dir_all(&self.uploads).map_err(|source| PlotpathError::DataDirectory {
            path: self.uploads.clone(),
            source,
        })
    }
}

/// Explicit directory if given, else the platform data directory, else
/// `./data`.
pub fn resolve_data_dir(explicit: Option<&str>) -> PathBuf {
    match explicit {
        Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("data")),
    }
}

/// Opens the cache, builds the pipeline and returns the job service.
pub fn build_service(config: &Config, layout: &DataLayout) -> Result<JobService, PlotpathError> {
    layout.create()?;
    let cache = ResultCache::open(&layout.cache_index, &layout.ai_cache)?;
    info!(
        "AI cache ready at {} ({} entries)",
        display(&layout.ai_cache),
        cache.len()?
    );

    let pipeline_config = Arc::new(PipelineConfig::from_config(config));
    info!(
        "Tracer: {}, generator: {}, transform endpoint: {}",
        pipeline_config.tracer_program,
        pipeline_config.generator_program,
        sanitize::redact_query(&pipeline_config.transform_endpoint)
    );
    let pipeline = Arc::new(Pipeline::from_config(pipeline_config, cache)?);

    let launcher = JobLauncher::new(pipeline, Arc::new(JobRegistry::new()));
    Ok(JobService::new(launcher, layout.uploads.clone()))
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
