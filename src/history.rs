//! Build history
//!
//! Keeps a bounded JSON-lines log at `~/.local/state/polybuild/history.jsonl`
//! of past builds. It feeds `polybuild stats` and lets the adaptive strategy
//! prefer whatever has worked best for projects of the same type.

use crate::config::{schema::Config, ConfigManager};
use crate::detect::Language;
use crate::strategy::BuildStrategy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

/// Weight of success rate in the strategy score; speed gets the rest
const SUCCESS_WEIGHT: f64 = 0.7;

/// One finished build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildMetrics {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub strategy: BuildStrategy,
    pub project_type: String,
    pub languages: Vec<Language>,
    pub files_analyzed: usize,
    pub cache_hit: bool,
    pub success: bool,
}

impl BuildMetrics {
    pub fn duration_secs(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }
}

/// Aggregates over the whole history
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildStatistics {
    pub total_builds: usize,
    pub successful_builds: usize,
    pub success_rate: f64,
    pub average_duration_secs: f64,
    pub cache_hit_rate: f64,
}

impl BuildStatistics {
    pub fn from_records(records: &[BuildMetrics]) -> Self {
        let total = records.len();
        if total == 0 {
            return Self::default();
        }

        let successful = records.iter().filter(|r| r.success).count();
        let cache_hits = records.iter().filter(|r| r.cache_hit).count();
        let duration: f64 = records.iter().map(BuildMetrics::duration_secs).sum();

        Self {
            total_builds: total,
            successful_builds: successful,
            success_rate: successful as f64 / total as f64,
            average_duration_secs: duration / total as f64,
            cache_hit_rate: cache_hits as f64 / total as f64,
        }
    }
}

/// Strategy with the best score among builds of `project_type`.
///
/// Score = 0.7 x success rate + 0.3 x 1 / (average seconds + 1).
pub fn best_strategy(records: &[BuildMetrics], project_type: &str) -> Option<BuildStrategy> {
    // strategy -> (successes, count, total seconds)
    let mut tally: BTreeMap<&'static str, (BuildStrategy, usize, usize, f64)> = BTreeMap::new();
    for record in records.iter().filter(|r| r.project_type == project_type) {
        let entry = tally
            .entry(record.strategy.as_str())
            .or_insert((record.strategy, 0, 0, 0.0));
        if record.success {
            entry.1 += 1;
        }
        entry.2 += 1;
        entry.3 += record.duration_secs();
    }

    let mut best: Option<(BuildStrategy, f64)> = None;
    for (strategy, successes, count, total_secs) in tally.into_values() {
        let success_rate = successes as f64 / count as f64;
        let average = total_secs / count as f64;
        let score = SUCCESS_WEIGHT * success_rate + (1.0 - SUCCESS_WEIGHT) / (average + 1.0);
        if best.map(|(_, s)| score > s).unwrap_or(true) {
            best = Some((strategy, score));
        }
    }

    best.map(|(strategy, _)| strategy)
}

/// Bounded build metrics log
pub struct BuildHistory {
    enabled: bool,
    path: PathBuf,
    limit: usize,
}

impl BuildHistory {
    /// Create a history log from config
    pub fn new(config: &Config) -> Self {
        Self {
            enabled: config.general.history,
            path: ConfigManager::history_path(),
            limit: config.general.history_limit,
        }
    }

    pub fn with_path(path: PathBuf, limit: usize) -> Self {
        Self {
            enabled: true,
            path,
            limit,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a build, dropping the oldest entries beyond the limit.
    ///
    /// Failures are logged and swallowed; history must never fail a build.
    pub async fn record(&self, metrics: &BuildMetrics) {
        if !self.enabled {
            return;
        }

        let mut records = self.load().await;
        records.push(metrics.clone());
        let excess = records.len().saturating_sub(self.limit.max(1));
        records.drain(..excess);

        if let Err(e) = self.write(&records).await {
            warn!("Failed to write build history: {}", e);
        }
    }

    async fn write(&self, records: &[BuildMetrics]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut content = String::new();
        for record in records {
            let line = serde_json::to_string(record).map_err(std::io::Error::other)?;
            content.push_str(&line);
            content.push('\n');
        }

        let temp = self.path.with_extension(format!("{}.tmp", Uuid::new_v4()));
        fs::write(&temp, content).await?;
        fs::rename(&temp, &self.path).await
    }

    /// All readable entries, oldest first; malformed lines are skipped
    pub async fn load(&self) -> Vec<BuildMetrics> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Failed to read build history: {}", e);
                return Vec::new();
            }
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    debug!("Skipping malformed history line: {}", e);
                    None
                }
            })
            .collect()
    }

    pub async fn statistics(&self) -> BuildStatistics {
        BuildStatistics::from_records(&self.load().await)
    }

    pub async fn best_strategy(&self, project_type: &str) -> Option<BuildStrategy> {
        if !self.enabled {
            return None;
        }
        best_strategy(&self.load().await, project_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn metrics(strategy: BuildStrategy, success: bool, duration_ms: u64) -> BuildMetrics {
        BuildMetrics {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            duration_ms,
            strategy,
            project_type: "rust".to_string(),
            languages: vec![Language::Rust],
            files_analyzed: 3,
            cache_hit: false,
            success,
        }
    }

    #[tokio::test]
    async fn records_and_loads() {
        let dir = TempDir::new().unwrap();
        let history = BuildHistory::with_path(dir.path().join("history.jsonl"), 100);

        let first = metrics(BuildStrategy::Parallel, true, 1500);
        history.record(&first).await;
        history.record(&metrics(BuildStrategy::Incremental, false, 500)).await;

        let loaded = history.load().await;
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], first);

        let content = tokio::fs::read_to_string(history.path()).await.unwrap();
        assert_eq!(content.trim().lines().count(), 2);
    }

    #[tokio::test]
    async fn keeps_only_most_recent() {
        let dir = TempDir::new().unwrap();
        let history = BuildHistory::with_path(dir.path().join("history.jsonl"), 3);

        for ms in 0..5 {
            history.record(&metrics(BuildStrategy::Parallel, true, ms)).await;
        }

        let durations: Vec<u64> = history.load().await.iter().map(|m| m.duration_ms).collect();
        assert_eq!(durations, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn skips_malformed_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.jsonl");
        let good = serde_json::to_string(&metrics(BuildStrategy::Cached, true, 10)).unwrap();
        tokio::fs::write(&path, format!("not json\n{}\n", good)).await.unwrap();

        let history = BuildHistory::with_path(path, 100);
        assert_eq!(history.load().await.len(), 1);
    }

    #[tokio::test]
    async fn skips_when_disabled() {
        let dir = TempDir::new().unwrap();
        let history = BuildHistory {
            enabled: false,
            path: dir.path().join("history.jsonl"),
            limit: 100,
        };

        history.record(&metrics(BuildStrategy::Parallel, true, 1)).await;
        assert!(!history.path.exists());
    }

    #[test]
    fn statistics_aggregate() {
        let mut hit = metrics(BuildStrategy::Cached, true, 0);
        hit.cache_hit = true;
        let records = vec![
            metrics(BuildStrategy::Parallel, true, 2000),
            metrics(BuildStrategy::Parallel, false, 4000),
            hit,
            metrics(BuildStrategy::Incremental, true, 6000),
        ];

        let stats = BuildStatistics::from_records(&records);
        assert_eq!(stats.total_builds, 4);
        assert_eq!(stats.successful_builds, 3);
        assert!((stats.success_rate - 0.75).abs() < 1e-9);
        assert!((stats.average_duration_secs - 3.0).abs() < 1e-9);
        assert!((stats.cache_hit_rate - 0.25).abs() < 1e-9);

        assert_eq!(BuildStatistics::from_records(&[]), BuildStatistics::default());
    }

    #[test]
    fn best_strategy_weighs_success_over_speed() {
        let records = vec![
            // fast but unreliable
            metrics(BuildStrategy::Parallel, false, 100),
            metrics(BuildStrategy::Parallel, true, 100),
            // slow but always succeeds
            metrics(BuildStrategy::DependencyGraph, true, 9000),
            metrics(BuildStrategy::DependencyGraph, true, 9000),
        ];

        // parallel: 0.7*0.5 + 0.3/1.1 = 0.622; graph: 0.7 + 0.3/10 = 0.73
        assert_eq!(best_strategy(&records, "rust"), Some(BuildStrategy::DependencyGraph));
        assert_eq!(best_strategy(&records, "go"), None);
    }
}
