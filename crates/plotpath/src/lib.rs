//! Image to plotter G-code conversion.
//!
//! An uploaded raster image is optionally redrawn as line art by an AI
//! image service (results cached by content), traced to SVG, stripped of
//! background strokes, scaled to a physical size and converted to G-code.

pub mod app;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod pipeline;
pub mod sanitize;
pub mod server;
pub mod service;
pub mod svg;
pub mod tools;
pub mod transform;
pub mod worker;

pub use cache::{CacheError, CachedResult, Fingerprint, ResultCache};
pub use config::{load_config, Config};
pub use error::{ConfigError, PlotpathError, Result};
pub use jobs::{Job, JobId, JobRegistry, JobRequest, JobStatus};
pub use pipeline::{Pipeline, PipelineConfig, PipelineContext};
pub use service::{JobService, Upload};
pub use transform::{ApiKey, ImageTransformer};
