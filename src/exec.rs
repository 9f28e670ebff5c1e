//! Command execution wrapper.
//!
//! Spawns the child command with captured stdio, applies the resolved
//! transformer to the captured output, and reports the outcome. The wrapper
//! owns exit-code propagation: whatever happens to the transformation, the
//! child's real exit code travels through unchanged, and an invocation-tier
//! transformation failure surfaces alongside the original captured output
//! rather than replacing it.

use crate::error::{BackendError, ExecError};
use crate::transform::Transformer;
use std::process::{Command, ExitStatus};
use tracing::debug;

/// Captured result of one child command execution
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub command: Vec<String>,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// A command execution after transformation
pub struct ProcessedCommand {
    /// The stdout artifact: transformed output, or the original captured
    /// stdout when transformation failed.
    pub output: String,
    /// Captured child stderr, passed through for presentation.
    pub stderr: String,
    /// The child's exit code, propagated verbatim.
    pub exit_code: i32,
    /// The surfaced invocation-tier failure, when transformation failed.
    pub transform_error: Option<BackendError>,
}

/// Execute a command with captured stdio.
pub fn run_command(command: &[String]) -> Result<CommandResult, ExecError> {
    let (program, args) = command.split_first().ok_or(ExecError::EmptyCommand)?;

    debug!(command = %command.join(" "), "executing child command");
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| ExecError::Spawn {
            command: program.clone(),
            source,
        })?;

    Ok(CommandResult {
        command: command.to_vec(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: exit_code(output.status),
    })
}

/// Execute a command and apply the transformer to its captured output.
///
/// Transformation failures do not fail the wrapper: the original stdout is
/// kept as the artifact and the error is carried in the result for the
/// caller to surface.
pub async fn process_command(
    command: &[String],
    transformer: &dyn Transformer,
) -> Result<ProcessedCommand, ExecError> {
    let result = run_command(command)?;

    match transformer
        .transform(&result.command, &result.stdout, &result.stderr)
        .await
    {
        Ok(output) => Ok(ProcessedCommand {
            output,
            stderr: result.stderr,
            exit_code: result.exit_code,
            transform_error: None,
        }),
        Err(e) => Ok(ProcessedCommand {
            output: result.stdout,
            stderr: result.stderr,
            exit_code: result.exit_code,
            transform_error: Some(e),
        }),
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::IdentityTransformer;

    fn command(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_run_command_captures_stdout_and_exit_code() {
        let result = run_command(&command(&["echo", "hello"])).unwrap();
        assert_eq!(result.stdout, "hello\n");
        assert_eq!(result.stderr, "");
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.command, command(&["echo", "hello"]));
    }

    #[test]
    fn test_run_command_propagates_nonzero_exit_code() {
        let result = run_command(&command(&["false"])).unwrap();
        assert_eq!(result.exit_code, 1);
    }

    #[test]
    fn test_run_command_captures_stderr() {
        let result = run_command(&command(&["sh", "-c", "echo oops >&2; exit 3"])).unwrap();
        assert_eq!(result.stdout, "");
        assert_eq!(result.stderr, "oops\n");
        assert_eq!(result.exit_code, 3);
    }

    #[test]
    fn test_run_command_missing_binary_is_spawn_error() {
        let error = run_command(&command(&["pith-no-such-binary-xyzzy"])).unwrap_err();
        assert!(matches!(error, ExecError::Spawn { .. }));
    }

    #[test]
    fn test_run_command_empty_command_line() {
        let error = run_command(&[]).unwrap_err();
        assert!(matches!(error, ExecError::EmptyCommand));
    }

    #[tokio::test]
    async fn test_process_command_identity_passthrough() {
        let processed = process_command(&command(&["echo", "hello"]), &IdentityTransformer)
            .await
            .unwrap();
        assert_eq!(processed.output, "hello\n");
        assert_eq!(processed.exit_code, 0);
        assert!(processed.transform_error.is_none());
    }

    #[tokio::test]
    async fn test_process_command_surfaces_transform_failure_with_original_output() {
        use crate::error::BackendError;
        use async_trait::async_trait;

        #[derive(Debug)]
        struct FailingTransformer;

        #[async_trait]
        impl Transformer for FailingTransformer {
            async fn transform(
                &self,
                _command: &[String],
                _stdout: &str,
                _stderr: &str,
            ) -> Result<String, BackendError> {
                Err(BackendError::Timeout(std::time::Duration::from_secs(5)))
            }

            fn kind(&self) -> &'static str {
                "llm"
            }
        }

        let processed = process_command(
            &command(&["sh", "-c", "echo real; exit 7"]),
            &FailingTransformer,
        )
        .await
        .unwrap();

        assert_eq!(processed.output, "real\n");
        assert_eq!(processed.exit_code, 7);
        assert!(matches!(
            processed.transform_error,
            Some(BackendError::Timeout(_))
        ));
    }
}
