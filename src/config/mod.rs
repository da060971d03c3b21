//! Configuration management for Polybuild

pub mod schema;

pub use schema::Config;

use crate::error::{PolybuildError, PolybuildResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Project-local configuration file name
pub const LOCAL_CONFIG_FILE: &str = ".polybuild.toml";

/// Overrides the global config file path
pub const CONFIG_ENV: &str = "POLYBUILD_CONFIG";

/// Overrides the state directory
pub const STATE_DIR_ENV: &str = "POLYBUILD_STATE_DIR";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("polybuild")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        if let Some(path) = std::env::var_os(STATE_DIR_ENV) {
            return PathBuf::from(path);
        }
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("polybuild")
    }

    /// Get the build history path
    pub fn history_path() -> PathBuf {
        Self::state_dir().join("history.jsonl")
    }

    /// Find the nearest `.polybuild.toml` at or above `start`
    pub fn find_local_config(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(LOCAL_CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> PolybuildResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> PolybuildResult<Config> {
        let value = Self::read_table(path).await?;
        Self::into_config(value, path)
    }

    /// Load the global config overlaid with the project's local config.
    ///
    /// Tables merge key by key, so a local file only needs the settings it
    /// changes.
    pub async fn load_merged(&self, project: Option<&Path>) -> PolybuildResult<Config> {
        let mut merged = if self.config_path.exists() {
            Self::read_table(&self.config_path).await?
        } else {
            toml::Value::Table(toml::Table::new())
        };

        let local = project.and_then(Self::find_local_config);
        let Some(local) = local else {
            return Self::into_config(merged, &self.config_path);
        };

        debug!("Using local config {}", local.display());
        let overlay = Self::read_table(&local).await?;
        merge_values(&mut merged, overlay);
        Self::into_config(merged, &local)
    }

    async fn read_table(path: &Path) -> PolybuildResult<toml::Value> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            PolybuildError::io(format!("reading config from {}", path.display()), e)
        })?;

        content
            .parse::<toml::Table>()
            .map(toml::Value::Table)
            .map_err(|e| PolybuildError::ConfigInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    fn into_config(value: toml::Value, path: &Path) -> PolybuildResult<Config> {
        value
            .try_into::<Config>()
            .map_err(|e| PolybuildError::ConfigInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> PolybuildResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            PolybuildError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> PolybuildResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PolybuildError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursively overlay `overlay` onto `base`; non-table values replace
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
