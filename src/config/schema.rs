//! Configuration schema for Polybuild
//!
//! Global configuration lives at `~/.config/polybuild/config.toml`; a
//! project may add a `.polybuild.toml` that overrides it section by section.

use crate::fingerprint::{DEFAULT_IGNORE_DIRS, DEFAULT_MAX_FILE_SIZE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// File fingerprinting
    pub fingerprint: FingerprintConfig,

    /// Build cache
    pub cache: CacheConfig,

    /// Build execution
    pub build: BuildConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Record build metrics for `stats` and adaptive strategy selection
    pub history: bool,

    /// Number of builds kept in the history log
    pub history_limit: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            history: true,
            history_limit: 100,
        }
    }
}

/// Fingerprinting settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    /// Files at or above this size are left out of signatures
    pub max_file_size_mb: u64,

    /// Directory names never descended into
    pub ignore_dirs: Vec<String>,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE / (1024 * 1024),
            ignore_dirs: DEFAULT_IGNORE_DIRS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

impl FingerprintConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Consult and update the build cache (default: true)
    pub enabled: bool,

    /// Cache directory; relative paths resolve against the project root
    pub dir: PathBuf,

    /// Entries older than N days are removed by `cache gc` (0 = never)
    pub gc_days: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from(".polybuild/cache"),
            gc_days: 30,
        }
    }
}

impl CacheConfig {
    /// Cache directory for a given project
    pub fn resolve_dir(&self, project: &Path) -> PathBuf {
        if self.dir.is_absolute() {
            self.dir.clone()
        } else {
            project.join(&self.dir)
        }
    }
}

/// Build execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Default strategy name
    pub strategy: String,

    /// Per-command timeout in seconds
    pub timeout_secs: u64,

    /// Maximum concurrent units for the parallel strategy (0 = CPU count)
    pub jobs: usize,

    /// Refuse to build when unit dependencies form a cycle
    pub fail_on_cycle: bool,

    /// Unit name -> names of units it depends on
    pub dependencies: BTreeMap<String, Vec<String>>,

    /// User-defined units; a unit named like a detected tool replaces it
    pub units: BTreeMap<String, UnitConfig>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            strategy: "adaptive".to_string(),
            timeout_secs: 300,
            jobs: 0,
            fail_on_cycle: true,
            dependencies: BTreeMap::new(),
            units: BTreeMap::new(),
        }
    }
}

/// A user-defined build unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitConfig {
    /// Shell commands run in order from the project root
    pub commands: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[build]"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.build.strategy, "adaptive");
        assert_eq!(config.build.timeout_secs, 300);
        assert_eq!(config.fingerprint.max_file_size_mb, 10);
        assert_eq!(config.general.history_limit, 100);
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [build]
            jobs = 4

            [build.dependencies]
            app = ["lib"]

            [build.units.lib]
            commands = ["make -C lib"]
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.build.jobs, 4);
        assert_eq!(config.build.dependencies["app"], vec!["lib"]);
        assert_eq!(config.build.units["lib"].commands, vec!["make -C lib"]);
        assert!(config.build.fail_on_cycle); // default preserved
    }

    #[test]
    fn cache_dir_resolves_against_project() {
        let cache = CacheConfig::default();
        assert_eq!(
            cache.resolve_dir(Path::new("/work/app")),
            PathBuf::from("/work/app/.polybuild/cache")
        );
    }
}
