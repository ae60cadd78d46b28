//! Post-processing of traced vector documents.
//!
//! Pure functions over the SVG text produced by the tracer: read the
//! declared size, compute the fit-to-box scale, and strip near-white
//! strokes the tracer emits for the image background.

use std::path::PathBuf;

use thiserror::Error;

pub mod dimensions;
pub mod filter;
pub mod scale;

pub use dimensions::{extract_dimensions, read_dimensions, Dimensions, DEFAULT_DIMENSION};
pub use filter::{
    filter_background_file, filter_background_paths, FilterReport, NEAR_WHITE_THRESHOLD,
};
pub use scale::{compute_fit_scale, format_resolution, resolution_for, MM_PER_INCH};

#[derive(Error, Debug)]
pub enum SvgError {
    #[error("Malformed SVG near byte {position}: {message}")]
    Parse { position: u64, message: String },

    #[error("Failed to serialize SVG: {0}")]
    Write(String),

    #[error("Failed to access SVG '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
