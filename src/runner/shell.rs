//! Shell-backed command runner

use super::{CommandOutput, CommandRunner, CommandStatus, DEFAULT_TIMEOUT};
use crate::error::{PolybuildError, PolybuildResult};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs commands through the platform shell with a timeout
#[derive(Debug, Clone)]
pub struct ShellRunner {
    timeout: Duration,
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl ShellRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn shell_command(command: &str) -> Command {
        #[cfg(windows)]
        {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", command]);
            cmd
        }
        #[cfg(not(windows))]
        {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", command]);
            cmd
        }
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str, cwd: &Path) -> PolybuildResult<CommandOutput> {
        debug!("Executing in {}: {}", cwd.display(), command);
        let started = Instant::now();

        let child = Self::shell_command(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PolybuildError::command_failed(command, e))?;

        // Dropping the future on timeout kills the child
        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => {
                let output = result.map_err(|e| PolybuildError::command_failed(command, e))?;
                let status = if output.status.success() {
                    CommandStatus::Success
                } else {
                    CommandStatus::Failed(output.status.code())
                };
                Ok(CommandOutput {
                    command: command.to_string(),
                    status,
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    duration: started.elapsed(),
                })
            }
            Err(_) => {
                warn!("Command timed out after {:?}: {}", self.timeout, command);
                Ok(CommandOutput {
                    command: command.to_string(),
                    status: CommandStatus::TimedOut,
                    stdout: String::new(),
                    stderr: format!("Command timed out after {}s", self.timeout.as_secs()),
                    duration: started.elapsed(),
                })
            }
        }
    }

    fn runner_name(&self) -> &'static str {
        "shell"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn captures_stdout() {
        let dir = TempDir::new().unwrap();
        let output = ShellRunner::default()
            .run("echo hello", dir.path())
            .await
            .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn runs_in_working_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();

        let output = ShellRunner::default()
            .run("ls", dir.path())
            .await
            .unwrap();
        assert!(output.stdout.contains("marker.txt"));
    }

    #[tokio::test]
    async fn non_zero_exit_is_failure() {
        let dir = TempDir::new().unwrap();
        let output = ShellRunner::default()
            .run("echo oops >&2; exit 3", dir.path())
            .await
            .unwrap();

        assert_eq!(output.status, CommandStatus::Failed(Some(3)));
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let dir = TempDir::new().unwrap();
        let output = ShellRunner::new(Duration::from_millis(200))
            .run("sleep 5", dir.path())
            .await
            .unwrap();

        assert_eq!(output.status, CommandStatus::TimedOut);
        assert!(output.duration < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn missing_directory_is_spawn_error() {
        let err = ShellRunner::default()
            .run("true", Path::new("/definitely/not/here"))
            .await
            .unwrap_err();
        assert!(matches!(err, PolybuildError::CommandFailed { .. }));
    }
}
