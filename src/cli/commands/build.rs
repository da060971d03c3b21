//! Build command - analyze a project and run its build units

use super::project::{self, ProjectAnalysis};
use crate::build::{
    BuildOptions, BuildOrchestrator, BuildPlan, BuildReport, FreshnessPolicy, UnitReport,
    UnitStatus,
};
use crate::cache::CacheStore;
use crate::cli::args::BuildArgs;
use crate::config::Config;
use crate::error::{PolybuildError, PolybuildResult};
use crate::history::{BuildHistory, BuildMetrics};
use crate::runner::ShellRunner;
use crate::strategy::BuildStrategy;
use crate::ui::{self, format_duration, BuildProgress, TaskSpinner, UiContext};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Lines of failed command output shown after a build
const FAILURE_TAIL_LINES: usize = 20;

/// Execute the build command
pub async fn execute(args: BuildArgs, config: &Config, ctx: &UiContext) -> PolybuildResult<()> {
    let started_at = Utc::now();
    ui::intro(ctx, "polybuild");

    let mut spinner = TaskSpinner::new(ctx);
    spinner.start("Analyzing project...");
    let analysis = match project::analyze(&args.path, config) {
        Ok(analysis) => analysis,
        Err(e) => {
            spinner.stop_error("Analysis failed");
            return Err(e);
        }
    };
    spinner.stop(&format!(
        "{} files fingerprinted, project type {}",
        analysis.scan.signature.len(),
        analysis.profile.project_type()
    ));
    if !analysis.scan.skipped.is_empty() {
        ui::remark(
            ctx,
            &format!(
                "{} files skipped (too large or unreadable)",
                analysis.scan.skipped.len()
            ),
        );
    }

    let units = analysis.units(config);
    if units.is_empty() {
        return Err(PolybuildError::NoBuildTools(analysis.root.clone()));
    }
    let plan = BuildPlan::new(units, &config.build.dependencies);

    let requested = match args.strategy {
        Some(strategy) => strategy,
        None => config.build.strategy.parse()?,
    };
    let options = BuildOptions {
        strategy: requested,
        jobs: args.jobs.unwrap_or(config.build.jobs),
        fail_on_cycle: config.build.fail_on_cycle,
        freshness: FreshnessPolicy::default(),
    };

    let cache = open_cache(&analysis, config, args.no_cache)?;
    let timeout = Duration::from_secs(args.timeout.unwrap_or(config.build.timeout_secs));
    let runner = Arc::new(ShellRunner::new(timeout));

    let history = BuildHistory::new(config);
    let project_type = analysis.profile.project_type();
    let learned = if requested == BuildStrategy::Adaptive {
        history.best_strategy(&project_type).await
    } else {
        None
    };
    if let Some(strategy) = learned {
        debug!("History favours {} for {}", strategy, project_type);
    }

    if args.dry_run {
        let orchestrator =
            BuildOrchestrator::new(analysis.root.clone(), runner, cache, options);
        return show_plan(ctx, &orchestrator, &plan, &analysis, learned).await;
    }

    let progress = Arc::new(BuildProgress::new(ctx, plan.len()));
    let observer = {
        let progress = Arc::clone(&progress);
        Box::new(move |report: &UnitReport| progress.on_unit(report))
    };
    let orchestrator = BuildOrchestrator::new(analysis.root.clone(), runner, cache, options)
        .with_observer(observer);

    let result = orchestrator
        .run(
            &plan,
            &analysis.scan.signature,
            &analysis.profile.hints,
            learned,
        )
        .await;
    progress.finish();
    let report = result?;

    history
        .record(&BuildMetrics {
            id: Uuid::new_v4(),
            started_at,
            duration_ms: report.duration.as_millis() as u64,
            strategy: report.strategy,
            project_type,
            languages: analysis.profile.languages.clone(),
            files_analyzed: analysis.profile.files_analyzed,
            cache_hit: report.cache_hit,
            success: report.success(),
        })
        .await;

    print_report(ctx, &report);

    match report.error() {
        Some(err) => {
            if err.is_retryable() {
                ui::remark(ctx, "The unit timed out; a rerun may succeed");
            }
            ui::outro_error(ctx, "Build failed");
            Err(err)
        }
        None if report.cache_hit => {
            ui::outro_success(ctx, "Everything up to date");
            Ok(())
        }
        None => {
            ui::outro_success(
                ctx,
                &format!("Build complete in {}", format_duration(report.duration)),
            );
            Ok(())
        }
    }
}

fn open_cache(
    analysis: &ProjectAnalysis,
    config: &Config,
    no_cache: bool,
) -> PolybuildResult<Option<CacheStore>> {
    if no_cache {
        debug!("Cache bypassed (--no-cache)");
        return Ok(None);
    }
    if !config.cache.enabled {
        debug!("Cache disabled in config");
        return Ok(None);
    }
    CacheStore::open(config.cache.resolve_dir(&analysis.root)).map(Some)
}

async fn show_plan(
    ctx: &UiContext,
    orchestrator: &BuildOrchestrator,
    plan: &BuildPlan,
    analysis: &ProjectAnalysis,
    learned: Option<BuildStrategy>,
) -> PolybuildResult<()> {
    let assessment = orchestrator.assess(plan, &analysis.scan.signature).await?;
    let strategy = orchestrator.choose_strategy(&analysis.profile.hints, &assessment, learned);

    ui::section(ctx, "Plan");
    ui::key_value(ctx, "Strategy", strategy.as_str());
    for (i, wave) in plan.waves().iter().enumerate() {
        ui::key_value(ctx, &format!("Wave {}", i + 1), &wave.join(", "));
    }

    ui::section(ctx, "Units");
    for unit in plan.ordered_units() {
        let fresh = assessment.fresh.contains(&unit.name);
        let state = if fresh { "up to date" } else { "stale" };
        ui::key_value_status(ctx, &unit.name, state, fresh);
        for command in &unit.commands {
            ui::remark(ctx, command);
        }
    }

    for cycle in plan.cycles() {
        ui::step_warn(ctx, &format!("Dependency cycle: {}", cycle));
    }

    ui::outro_warn(ctx, "Dry run - nothing was built");
    Ok(())
}

fn print_report(ctx: &UiContext, report: &BuildReport) {
    // CI mode already printed one line per unit as they finished
    if ctx.use_fancy_output() {
        ui::section(ctx, &format!("Units ({} strategy)", report.strategy));
        for unit in &report.units {
            match &unit.status {
                UnitStatus::Built => ui::step_ok_detail(
                    ctx,
                    &unit.name,
                    &format!("built in {}", format_duration(unit.duration)),
                ),
                UnitStatus::Fresh => ui::step_ok_detail(ctx, &unit.name, "up to date"),
                UnitStatus::Failed { command, reason } => {
                    ui::step_error_detail(ctx, &unit.name, &format!("`{}` {}", command, reason))
                }
                UnitStatus::NotRun => ui::step_blocked(ctx, &unit.name, "not run"),
            }
        }
    }

    if let Some(failed) = report.failure() {
        if let Some(output) = failed.outputs.last() {
            ui::note(ctx, &format!("{} output", failed.name), &tail(&output.transcript()));
        }
    }

    if !report.invalidated.is_empty() {
        warn!("Invalidated cache entries: {}", report.invalidated.join(", "));
        ui::remark(
            ctx,
            &format!("Invalidated cache: {}", report.invalidated.join(", ")),
        );
    }
}

/// Last lines of a command transcript
fn tail(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(FAILURE_TAIL_LINES);
    lines[start..].join("\n")
}
