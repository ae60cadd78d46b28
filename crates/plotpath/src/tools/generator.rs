use std::path::Path;

use super::{Invocation, ToolError, ToolOutput};

/// Vector-to-G-code converter (svg2gcode compatible).
#[derive(Debug, Clone)]
pub struct ToolpathGenerator {
    program: String,
}

impl ToolpathGenerator {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// `resolution` is passed through verbatim as `--dpi`.
    pub fn invocation(
        &self,
        svg: &Path,
        output: &Path,
        tool_on: &str,
        tool_off: &str,
        resolution: &str,
    ) -> Invocation {
        Invocation::new(&self.program)
            .arg("--on")
            .arg(tool_on)
            .arg("--off")
            .arg(tool_off)
            .arg("--dpi")
            .arg(resolution)
            .arg(svg)
            .arg("-o")
            .arg(output)
    }

    pub async fn generate(
        &self,
        svg: &Path,
        output: &Path,
        tool_on: &str,
        tool_off: &str,
        resolution: &str,
    ) -> Result<ToolOutput, ToolError> {
        self.invocation(svg, output, tool_on, tool_off, resolution)
            .run()
            .await
    }
}

impl Default for ToolpathGenerator {
    fn default() -> Self {
        Self::new("svg2gcode")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_keeps_tool_commands_whole() {
        let generator = ToolpathGenerator::default();
        let invocation = generator.invocation(
            Path::new("out.svg"),
            Path::new("out.gcode"),
            "S4 M0",
            "S4 M100",
            "422.6560",
        );
        assert_eq!(invocation.args()[1], "S4 M0");
        assert_eq!(invocation.args()[3], "S4 M100");
        assert_eq!(
            invocation.to_string(),
            "svg2gcode --on S4 M0 --off S4 M100 --dpi 422.6560 out.svg -o out.gcode"
        );
    }
}
