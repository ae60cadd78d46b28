//! External command-line tools driven by the pipeline.
//!
//! Both tools are plain child processes: arguments are passed as a list
//! (never through a shell), stdout and stderr are captured in full and a
//! non-zero exit status is a failure.

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;
use tokio::process::Command;

pub mod generator;
pub mod tracer;

pub use generator::ToolpathGenerator;
pub use tracer::Tracer;

/// Captured output of a finished tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Non-empty captured streams as `(heading, text)` pairs, stdout first.
    pub fn sections(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [("stdout", self.stdout.as_str()), ("stderr", self.stderr.as_str())]
            .into_iter()
            .filter(|(_, text)| !text.is_empty())
    }
}

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Failed to start {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed: {status}")]
    Failed {
        program: String,
        status: ExitStatus,
        output: ToolOutput,
    },

    #[error("{program} did not produce {}", path.display())]
    MissingOutput {
        program: String,
        path: PathBuf,
        output: ToolOutput,
    },
}

impl ToolError {
    /// Whatever the tool printed before failing, if it ran at all.
    pub fn output(&self) -> Option<&ToolOutput> {
        match self {
            ToolError::Launch { .. } => None,
            ToolError::Failed { output, .. } | ToolError::MissingOutput { output, .. } => {
                Some(output)
            }
        }
    }
}

/// A fully resolved tool command.
#[derive(Debug, Clone)]
pub struct Invocation {
    program: String,
    args: Vec<OsString>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Runs the command to completion and captures its output.
    pub async fn run(&self) -> Result<ToolOutput, ToolError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ToolError::Launch {
                program: self.program.clone(),
                source,
            })?;

        let captured = ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if output.status.success() {
            Ok(captured)
        } else {
            Err(ToolError::Failed {
                program: self.program.clone(),
                status: output.status,
                output: captured,
            })
        }
    }
}

/// Space-separated command line, as written to job logs.
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_arguments() {
        let invocation = Invocation::new("tool").arg("-a").arg("two words");
        assert_eq!(invocation.to_string(), "tool -a two words");
        assert_eq!(invocation.args().len(), 2);
    }

    #[tokio::test]
    async fn test_run_captures_output() {
        let output = Invocation::new("sh")
            .arg("-c")
            .arg("echo out; echo err >&2")
            .run()
            .await
            .unwrap();
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
        assert_eq!(output.sections().count(), 2);
    }

    #[tokio::test]
    async fn test_non_zero_exit_keeps_output() {
        let err = Invocation::new("sh")
            .arg("-c")
            .arg("echo broken >&2; exit 3")
            .run()
            .await
            .unwrap_err();
        match &err {
            ToolError::Failed { status, output, .. } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(output.stderr, "broken\n");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.output().is_some());
    }

    #[tokio::test]
    async fn test_missing_program_is_launch_error() {
        let err = Invocation::new("/nonexistent/plotpath-tool")
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Launch { .. }));
        assert!(err.output().is_none());
    }

    #[test]
    fn test_sections_skip_empty_streams() {
        let output = ToolOutput {
            stdout: String::new(),
            stderr: "warning".into(),
        };
        let sections: Vec<_> = output.sections().collect();
        assert_eq!(sections, vec![("stderr", "warning")]);
    }
}
