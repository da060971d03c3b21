//! Build orchestration
//!
//! Ties the pieces together: a [`BuildPlan`] says what to run and in which
//! order, the cache says which units are still fresh for the current
//! [`ProjectSignature`], and a [`CommandRunner`] executes the rest.
//! Successful units are recorded; a failed unit's record is invalidated
//! along with every record that depends on it.

mod plan;
mod record;

pub use plan::{merge_units, BuildPlan};
pub use record::{BuildRecord, FreshnessPolicy};

use crate::cache::{invalidate_cascade, CacheStore};
use crate::detect::{BuildUnit, OptimizationHints};
use crate::error::{PolybuildError, PolybuildResult};
use crate::fingerprint::ProjectSignature;
use crate::runner::{CommandOutput, CommandRunner};
use crate::strategy::{resolve_adaptive, BuildStrategy};
use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Knobs for a single build run
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub strategy: BuildStrategy,
    /// Maximum concurrent units for the parallel strategy (0 = CPU count)
    pub jobs: usize,
    pub fail_on_cycle: bool,
    pub freshness: FreshnessPolicy,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            strategy: BuildStrategy::Adaptive,
            jobs: 0,
            fail_on_cycle: true,
            freshness: FreshnessPolicy::Exact,
        }
    }
}

impl BuildOptions {
    /// Concurrency limit with `0` resolved to the CPU count
    pub fn effective_jobs(&self) -> usize {
        if self.jobs > 0 {
            return self.jobs;
        }
        detect_cpu_cores()
    }
}

/// Available CPU cores, at least 1
pub fn detect_cpu_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// What happened to one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitStatus {
    Built,
    /// Recorded outcome still matches; nothing ran
    Fresh,
    Failed { command: String, reason: String },
    /// Not attempted because an earlier or upstream unit failed
    NotRun,
}

/// Outcome of one unit within a build
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub name: String,
    #[serde(flatten)]
    pub status: UnitStatus,
    pub duration: Duration,
    #[serde(skip)]
    pub outputs: Vec<CommandOutput>,
}

/// Outcome of a whole build
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    /// Concrete strategy that ran
    pub strategy: BuildStrategy,
    pub units: Vec<UnitReport>,
    /// Nothing had to run
    pub cache_hit: bool,
    pub duration: Duration,
    /// Cache keys dropped because a unit failed
    pub invalidated: Vec<String>,
}

impl BuildReport {
    pub fn success(&self) -> bool {
        self.units
            .iter()
            .all(|u| matches!(u.status, UnitStatus::Built | UnitStatus::Fresh))
    }

    /// First failed unit
    pub fn failure(&self) -> Option<&UnitReport> {
        self.units
            .iter()
            .find(|u| matches!(u.status, UnitStatus::Failed { .. }))
    }

    /// The first failure as an error, for exit status and hints
    pub fn error(&self) -> Option<PolybuildError> {
        let unit = self.failure()?;
        match &unit.status {
            UnitStatus::Failed { command, reason } => Some(PolybuildError::BuildFailed {
                unit: unit.name.clone(),
                command: command.clone(),
                status: reason.clone(),
            }),
            _ => None,
        }
    }
}

/// Which units are fresh for a signature
#[derive(Debug, Clone, Default)]
pub struct Assessment {
    pub fresh: BTreeSet<String>,
    pub total: usize,
}

impl Assessment {
    /// Every unit has a fresh record
    pub fn all_fresh(&self) -> bool {
        self.total > 0 && self.fresh.len() == self.total
    }
}

/// Called once per unit as soon as its outcome is known
pub type UnitObserver = Box<dyn Fn(&UnitReport) + Send + Sync>;

/// Runs build plans against a project directory
pub struct BuildOrchestrator {
    root: PathBuf,
    runner: Arc<dyn CommandRunner>,
    cache: Option<CacheStore>,
    options: BuildOptions,
    observer: Option<UnitObserver>,
}

impl BuildOrchestrator {
    /// `cache = None` disables both freshness checks and recording
    pub fn new(
        root: impl Into<PathBuf>,
        runner: Arc<dyn CommandRunner>,
        cache: Option<CacheStore>,
        options: BuildOptions,
    ) -> Self {
        Self {
            root: root.into(),
            runner,
            cache,
            options,
            observer: None,
        }
    }

    /// Report each unit outcome as it happens (progress display)
    pub fn with_observer(mut self, observer: UnitObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Check each unit's recorded outcome against `signature`
    pub async fn assess(
        &self,
        plan: &BuildPlan,
        signature: &ProjectSignature,
    ) -> PolybuildResult<Assessment> {
        let total = plan.len();
        let Some(cache) = self.cache.clone() else {
            return Ok(Assessment {
                fresh: BTreeSet::new(),
                total,
            });
        };

        let units: Vec<(String, String, Vec<String>)> = plan
            .ordered_units()
            .map(|u| (u.name.clone(), u.cache_key(), u.commands.clone()))
            .collect();
        let signature = signature.clone();
        let policy = self.options.freshness;

        let fresh = blocking(move || {
            let mut fresh = BTreeSet::new();
            for (name, key, commands) in units {
                let record: Option<BuildRecord> = cache.get(&key)?;
                let is_fresh = record
                    .map(|r| r.is_fresh_for(&commands, &signature, policy))
                    .unwrap_or(false);
                debug!("Unit {} fresh: {}", name, is_fresh);
                if is_fresh {
                    fresh.insert(name);
                }
            }
            Ok(fresh)
        })
        .await?;

        Ok(Assessment { fresh, total })
    }

    /// Pick the concrete strategy this run will use
    pub fn choose_strategy(
        &self,
        hints: &OptimizationHints,
        assessment: &Assessment,
        learned: Option<BuildStrategy>,
    ) -> BuildStrategy {
        let cache_valid = assessment.all_fresh();
        match self.options.strategy {
            BuildStrategy::Adaptive => resolve_adaptive(hints, cache_valid, learned),
            BuildStrategy::Cached if !cache_valid => {
                warn!("Cache is not valid for every unit, building stale units incrementally");
                BuildStrategy::Incremental
            }
            other => other,
        }
    }

    /// Build `plan` for a project currently at `signature`
    pub async fn run(
        &self,
        plan: &BuildPlan,
        signature: &ProjectSignature,
        hints: &OptimizationHints,
        learned: Option<BuildStrategy>,
    ) -> PolybuildResult<BuildReport> {
        if !plan.cycles().is_empty() {
            let described: Vec<String> = plan.cycles().iter().map(|c| c.to_string()).collect();
            for cycle in &described {
                warn!("Dependency cycle: {}", cycle);
            }
            if self.options.fail_on_cycle {
                return Err(PolybuildError::CycleDetected(described.join("; ")));
            }
        }

        let started = Instant::now();
        let assessment = self.assess(plan, signature).await?;
        let strategy = self.choose_strategy(hints, &assessment, learned);
        info!("Building {} units with {} strategy", plan.len(), strategy);

        let mut state = RunState::default();
        match strategy {
            BuildStrategy::Cached => {
                for unit in plan.ordered_units() {
                    self.finish(&mut state, fresh_report(unit));
                }
            }
            BuildStrategy::Incremental => {
                self.run_sequential(plan, signature, strategy, Some(&assessment), &mut state)
                    .await?
            }
            BuildStrategy::DependencyGraph | BuildStrategy::Adaptive => {
                self.run_sequential(plan, signature, strategy, None, &mut state)
                    .await?
            }
            BuildStrategy::Parallel => {
                self.run_parallel(plan, signature, strategy, &mut state)
                    .await?
            }
        }

        let cache_hit = !plan.is_empty()
            && state
                .reports
                .values()
                .all(|r| r.status == UnitStatus::Fresh);
        let units = plan
            .order()
            .iter()
            .filter_map(|name| state.reports.remove(name))
            .collect();

        Ok(BuildReport {
            strategy,
            units,
            cache_hit,
            duration: started.elapsed(),
            invalidated: state.invalidated,
        })
    }

    /// Run units one at a time in plan order, stopping at the first failure.
    ///
    /// With an assessment, fresh units are skipped unless something they
    /// depend on was rebuilt in this run.
    async fn run_sequential(
        &self,
        plan: &BuildPlan,
        signature: &ProjectSignature,
        strategy: BuildStrategy,
        assessment: Option<&Assessment>,
        state: &mut RunState,
    ) -> PolybuildResult<()> {
        let mut rebuilt: BTreeSet<String> = BTreeSet::new();
        let mut failed = false;

        for unit in plan.ordered_units() {
            if failed {
                self.finish(state, not_run_report(unit));
                continue;
            }

            let upstream_rebuilt = plan.dependencies(&unit.name).iter().any(|d| rebuilt.contains(d));
            let skip = assessment
                .map(|a| a.fresh.contains(&unit.name) && !upstream_rebuilt)
                .unwrap_or(false);
            if skip {
                debug!("Skipping fresh unit {}", unit.name);
                self.finish(state, fresh_report(unit));
                continue;
            }

            let report = run_unit(self.runner.as_ref(), &self.root, unit).await;
            match report.status {
                UnitStatus::Built => {
                    rebuilt.insert(unit.name.clone());
                }
                _ => failed = true,
            }
            self.settle(plan, signature, strategy, report, state).await?;
        }

        Ok(())
    }

    /// Run waves concurrently, bounded by `jobs`. Units whose dependencies
    /// failed are not attempted.
    async fn run_parallel(
        &self,
        plan: &BuildPlan,
        signature: &ProjectSignature,
        strategy: BuildStrategy,
        state: &mut RunState,
    ) -> PolybuildResult<()> {
        let jobs = self.options.effective_jobs();
        let semaphore = Arc::new(Semaphore::new(jobs));
        debug!("Parallel build with {} jobs", jobs);

        for wave in plan.waves() {
            let mut tasks = JoinSet::new();

            for name in wave {
                let Some(unit) = plan.unit(&name) else {
                    continue;
                };
                let blocked = plan.dependencies(&name).iter().any(|dep| {
                    state
                        .reports
                        .get(dep)
                        .map(|r| matches!(r.status, UnitStatus::Failed { .. } | UnitStatus::NotRun))
                        .unwrap_or(false)
                });
                if blocked {
                    self.finish(state, not_run_report(unit));
                    continue;
                }

                let unit = unit.clone();
                let runner = Arc::clone(&self.runner);
                let root = self.root.clone();
                let semaphore = Arc::clone(&semaphore);
                tasks.spawn(async move {
                    let _permit = semaphore.acquire_owned().await;
                    run_unit(runner.as_ref(), &root, &unit).await
                });
            }

            // Records are written from this task only, one at a time
            while let Some(joined) = tasks.join_next().await {
                let report = joined
                    .map_err(|e| PolybuildError::Internal(format!("build task failed: {}", e)))?;
                self.settle(plan, signature, strategy, report, state).await?;
            }
        }

        Ok(())
    }

    /// Record or invalidate the unit's cache entry, then keep its report
    async fn settle(
        &self,
        plan: &BuildPlan,
        signature: &ProjectSignature,
        strategy: BuildStrategy,
        report: UnitReport,
        state: &mut RunState,
    ) -> PolybuildResult<()> {
        let Some(cache) = self.cache.clone() else {
            self.finish(state, report);
            return Ok(());
        };
        let Some(unit) = plan.unit(&report.name) else {
            self.finish(state, report);
            return Ok(());
        };

        match &report.status {
            UnitStatus::Built => {
                let record = BuildRecord {
                    unit: unit.name.clone(),
                    commands: unit.commands.clone(),
                    signature: signature.clone(),
                    strategy,
                    duration_ms: report.duration.as_millis() as u64,
                    recorded_at: Utc::now(),
                };
                let key = unit.cache_key();
                let dependencies = plan.dependency_keys(&unit.name);
                blocking(move || cache.set(&key, &record, dependencies)).await?;
            }
            UnitStatus::Failed { .. } => {
                let key = unit.cache_key();
                let removed = blocking(move || invalidate_cascade(&cache, &key)).await?;
                if !removed.is_empty() {
                    info!("Invalidated {} cache entries after {} failed", removed.len(), unit.name);
                }
                state.invalidated.extend(removed);
            }
            UnitStatus::Fresh | UnitStatus::NotRun => {}
        }

        self.finish(state, report);
        Ok(())
    }

    fn finish(&self, state: &mut RunState, report: UnitReport) {
        if let Some(observer) = &self.observer {
            observer(&report);
        }
        state.reports.insert(report.name.clone(), report);
    }
}

#[derive(Default)]
struct RunState {
    reports: BTreeMap<String, UnitReport>,
    invalidated: Vec<String>,
}

fn fresh_report(unit: &BuildUnit) -> UnitReport {
    UnitReport {
        name: unit.name.clone(),
        status: UnitStatus::Fresh,
        duration: Duration::ZERO,
        outputs: Vec::new(),
    }
}

fn not_run_report(unit: &BuildUnit) -> UnitReport {
    UnitReport {
        name: unit.name.clone(),
        status: UnitStatus::NotRun,
        duration: Duration::ZERO,
        outputs: Vec::new(),
    }
}

/// Run cache IO on the blocking pool; the store uses `std::fs`
async fn blocking<T, F>(f: F) -> PolybuildResult<T>
where
    F: FnOnce() -> PolybuildResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PolybuildError::Internal(format!("cache task failed: {}", e)))?
}

/// Run a unit's commands in order, stopping at the first that fails
async fn run_unit(runner: &dyn CommandRunner, root: &Path, unit: &BuildUnit) -> UnitReport {
    let started = Instant::now();
    let mut outputs = Vec::new();
    let mut status = UnitStatus::Built;

    info!("Building {}", unit.name);
    for command in &unit.commands {
        match runner.run(command, root).await {
            Ok(output) if output.success() => outputs.push(output),
            Ok(output) => {
                status = UnitStatus::Failed {
                    command: command.clone(),
                    reason: output.status.to_string(),
                };
                outputs.push(output);
                break;
            }
            Err(e) => {
                status = UnitStatus::Failed {
                    command: command.clone(),
                    reason: e.to_string(),
                };
                break;
            }
        }
    }

    if let UnitStatus::Failed { command, reason } = &status {
        warn!("Unit {} failed at `{}`: {}", unit.name, command, reason);
    }

    UnitReport {
        name: unit.name.clone(),
        status,
        duration: started.elapsed(),
        outputs,
    }
}
