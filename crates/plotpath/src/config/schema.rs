use serde::{Deserialize, Serialize};

use crate::pipeline::config::DEFAULT_DPI_PRECISION;
use crate::transform::gemini::DEFAULT_ENDPOINT;

pub const DEFAULT_LISTEN: &str = ":8000";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub server: ServerConfig,
    /// Root for uploads and the AI cache. Resolved at startup when absent.
    #[serde(default)]
    pub data_directory: Option<String>,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            server: ServerConfig::default(),
            data_directory: None,
            tools: ToolsConfig::default(),
            transform: TransformConfig::default(),
            output: OutputConfig::default(),
            upload: UploadConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// `host:port`, or `:port` for all interfaces.
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Shown on the index route. Falls back to the machine's hostname.
    #[serde(default)]
    pub hostname: Option<String>,
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            hostname: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_tracer")]
    pub tracer: String,
    #[serde(default = "default_toolpath_generator")]
    pub toolpath_generator: String,
}

fn default_tracer() -> String {
    "autotrace".to_string()
}

fn default_toolpath_generator() -> String {
    "svg2gcode".to_string()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            tracer: default_tracer(),
            toolpath_generator: default_toolpath_generator(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_dpi_precision")]
    pub dpi_precision: usize,
}

fn default_dpi_precision() -> usize {
    DEFAULT_DPI_PRECISION
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dpi_precision: default_dpi_precision(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}
