//! External build command execution
//!
//! The orchestrator talks to a [`CommandRunner`] rather than spawning
//! processes directly, so build logic can be exercised without real tools.

mod shell;

pub use shell::ShellRunner;

use crate::error::PolybuildResult;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Default per-command timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// How a command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "code", rename_all = "snake_case")]
pub enum CommandStatus {
    Success,
    /// Non-zero exit; `None` when terminated by a signal
    Failed(Option<i32>),
    TimedOut,
}

impl CommandStatus {
    pub fn success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed(Some(code)) => write!(f, "exit code {}", code),
            Self::Failed(None) => write!(f, "terminated by signal"),
            Self::TimedOut => write!(f, "timeout"),
        }
    }
}

/// Captured result of one command
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutput {
    pub command: String,
    pub status: CommandStatus,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Combined output for failure reports
    pub fn transcript(&self) -> String {
        format!(
            "Command: {}\nSTDOUT:\n{}\n\nSTDERR:\n{}",
            self.command, self.stdout, self.stderr
        )
    }
}

/// Runs one shell command in a working directory
///
/// Timeouts and non-zero exits are reported through [`CommandStatus`];
/// an `Err` means the command could not be started at all.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str, cwd: &Path) -> PolybuildResult<CommandOutput>;

    /// Human-readable runner name for logs
    fn runner_name(&self) -> &'static str;
}
