use std::time::Duration;

use crate::config::Config;
use crate::transform::gemini::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};

pub const DEFAULT_DPI_PRECISION: usize = 4;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub tracer_program: String,
    pub generator_program: String,
    /// Decimal places of the resolution handed to the generator.
    pub dpi_precision: usize,
    pub transform_endpoint: String,
    pub transform_timeout: Duration,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tracer_program: config.tools.tracer.clone(),
            generator_program: config.tools.toolpath_generator.clone(),
            dpi_precision: config.output.dpi_precision,
            transform_endpoint: config.transform.endpoint.clone(),
            transform_timeout: Duration::from_secs(config.transform.timeout_secs),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tracer_program: "autotrace".to_string(),
            generator_program: "svg2gcode".to_string(),
            dpi_precision: DEFAULT_DPI_PRECISION,
            transform_endpoint: DEFAULT_ENDPOINT.to_string(),
            transform_timeout: DEFAULT_TIMEOUT,
        }
    }
}
