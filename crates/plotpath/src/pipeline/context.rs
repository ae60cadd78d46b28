use std::path::PathBuf;

use crate::jobs::{AiImage, Job};
use crate::svg::Dimensions;

use super::error::PipelineWarning;

pub const SVG_FILENAME: &str = "output.svg";
pub const GCODE_FILENAME: &str = "output.gcode";

pub struct PipelineContext {
    // Input: snapshot of the registered job
    pub job: Job,
    pub input_path: PathBuf,

    // Image handed to the tracer; replaced by the AI step when it runs
    pub working_image: PathBuf,
    pub ai_image: Option<AiImage>,

    // Trace result
    pub svg_path: Option<PathBuf>,

    // Scale results
    pub dimensions: Option<Dimensions>,
    pub fitted: Option<(f64, f64)>,
    pub resolution: Option<String>,

    // Generate result
    pub artifact_path: Option<PathBuf>,

    // Non-fatal warnings
    pub warnings: Vec<PipelineWarning>,
}

impl PipelineContext {
    pub fn new(job: Job, input_path: PathBuf) -> Self {
        Self {
            job,
            working_image: input_path.clone(),
            input_path,
            ai_image: None,
            svg_path: None,
            dimensions: None,
            fitted: None,
            resolution: None,
            artifact_path: None,
            warnings: Vec::new(),
        }
    }

    pub fn svg_target(&self) -> PathBuf {
        self.job.work_dir.join(SVG_FILENAME)
    }

    pub fn gcode_target(&self) -> PathBuf {
        self.job.work_dir.join(GCODE_FILENAME)
    }
}
