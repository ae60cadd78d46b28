//! Shared test utilities for plotpath integration tests.
//!
//! - `TestHarness`: a job service over temp directories with stub tools
//! - `CountingTransformer`: an image transformer that records its calls

pub mod harness;

pub use harness::{CountingTransformer, TestHarness, TRACED_SVG};
