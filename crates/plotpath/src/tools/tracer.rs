use std::path::Path;

use super::{Invocation, ToolError, ToolOutput};

/// Raster-to-vector converter (autotrace compatible).
#[derive(Debug, Clone)]
pub struct Tracer {
    program: String,
}

impl Tracer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Centreline trace in two colours, written as SVG to `output`.
    pub fn invocation(&self, input: &Path, output: &Path) -> Invocation {
        Invocation::new(&self.program)
            .arg("-centerline")
            .arg("-color-count")
            .arg("2")
            .arg("-output-file")
            .arg(output)
            .arg(input)
    }

    /// Runs the trace. Succeeds only if the tool exits cleanly and the
    /// output document exists afterwards.
    pub async fn trace(&self, input: &Path, output: &Path) -> Result<ToolOutput, ToolError> {
        let captured = self.invocation(input, output).run().await?;
        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(ToolError::MissingOutput {
                program: self.program.clone(),
                path: output.to_path_buf(),
                output: captured,
            });
        }
        Ok(captured)
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new("autotrace")
    }
}
