//! Error types for Polybuild
//!
//! All modules use `PolybuildResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Polybuild operations
pub type PolybuildResult<T> = Result<T, PolybuildError>;

/// All errors that can occur in Polybuild
#[derive(Error, Debug)]
pub enum PolybuildError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Project errors
    #[error("Project directory not found: {0}")]
    ProjectNotFound(PathBuf),

    #[error("No build tools detected in {0}")]
    NoBuildTools(PathBuf),

    // Build errors
    #[error("Command failed to start: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Build failed: {unit} (`{command}` exited with {status})")]
    BuildFailed {
        unit: String,
        command: String,
        status: String,
    },

    #[error("Unknown build strategy: {0}")]
    UnknownStrategy(String),

    // Graph errors
    #[error("Dependency cycle detected: {0}")]
    CycleDetected(String),

    #[error("Invalid dependency file {path}: {reason}")]
    GraphFileInvalid { path: PathBuf, reason: String },

    // Cache errors
    #[error("Cache entry not found: {0}")]
    CacheEntryNotFound(String),

    #[error("Cache is disabled for this project")]
    CacheDisabled,

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl PolybuildError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BuildFailed { status, .. } if status == "timeout")
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NoBuildTools(_) => {
                Some("Declare a unit in .polybuild.toml: [build.units.NAME] commands = [\"...\"]")
            }
            Self::CycleDetected(_) => {
                Some("Break the cycle in [build.dependencies] or set build.fail_on_cycle = false")
            }
            Self::BuildFailed { status, .. } if status == "timeout" => {
                Some("Raise the limit with --timeout or build.timeout_secs")
            }
            Self::CacheDisabled => Some("Set cache.enabled = true in .polybuild.toml"),
            Self::CacheEntryNotFound(_) => Some("Run 'polybuild cache list' to see cached keys"),
            Self::UnknownStrategy(_) => Some(
                "Use one of: parallel, dependency_graph, incremental, cached, adaptive",
            ),
            _ => None,
        }
    }
}
