use async_trait::async_trait;
use log::{debug, warn};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::command_execution::types::CommandOutput;

/// Runs logical-service lifecycle commands.
///
/// Trait seam so control-plane tests can substitute a scripted runner.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> CommandOutput;
}

/// Executes shell commands in the repository working directory.
///
/// Commands are the registry's start/stop templates (`make start-postgres`
/// and friends); they run under `sh -c` with stdout/stderr captured and a
/// hard timeout. The executor never fails the caller: every outcome,
/// including spawn errors and timeouts, is folded into a [`CommandOutput`].
pub struct CommandExecutor {
    work_dir: PathBuf,
    command_timeout: Duration,
}

impl CommandExecutor {
    pub fn new(work_dir: PathBuf, command_timeout: Duration) -> Self {
        Self {
            work_dir,
            command_timeout,
        }
    }
}

#[async_trait]
impl CommandRunner for CommandExecutor {
    async fn run(&self, command: &str) -> CommandOutput {
        debug!("Executing command in {:?}: {}", self.work_dir, command);

        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to spawn command '{}': {}", command, e);
                return CommandOutput::failure(command, format!("Failed to spawn: {}", e), false);
            }
        };

        match timeout(self.command_timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let result = CommandOutput {
                    command: command.to_string(),
                    exit_code: output.status.code().unwrap_or(-1),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    timed_out: false,
                };
                debug!(
                    "Command '{}' finished with exit code {}",
                    command, result.exit_code
                );
                result
            }
            Ok(Err(e)) => {
                warn!("Failed to collect output of '{}': {}", command, e);
                CommandOutput::failure(command, format!("Failed to collect output: {}", e), false)
            }
            Err(_) => {
                warn!(
                    "Command '{}' timed out after {}s",
                    command,
                    self.command_timeout.as_secs()
                );
                CommandOutput::failure(
                    command,
                    format!(
                        "Command timed out after {} seconds",
                        self.command_timeout.as_secs()
                    ),
                    true,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor(timeout_secs: u64) -> CommandExecutor {
        CommandExecutor::new(
            std::env::temp_dir(),
            Duration::from_secs(timeout_secs),
        )
    }

    #[tokio::test]
    async fn captures_stdout_and_zero_exit() {
        let result = executor(5).run("echo hello").await;
        assert!(result.succeeded());
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout.trim(), "hello");
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn reports_nonzero_exit_with_stderr() {
        let result = executor(5).run("echo oops >&2; exit 3").await;
        assert!(!result.succeeded());
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn times_out_long_commands() {
        let executor = CommandExecutor::new(std::env::temp_dir(), Duration::from_millis(100));
        let result = executor.run("sleep 5").await;
        assert!(!result.succeeded());
        assert!(result.timed_out);
        assert_eq!(result.exit_code, -1);
        assert!(result.stderr.contains("timed out"));
    }
}
