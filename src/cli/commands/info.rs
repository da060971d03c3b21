//! Info command - show what detection found in a project

use super::project::{self, ProjectAnalysis};
use crate::cli::args::{InfoArgs, OutputFormat};
use crate::config::Config;
use crate::detect::BuildUnit;
use crate::error::PolybuildResult;
use crate::strategy::select_strategy;
use crate::ui::{self, UiContext};
use serde::Serialize;
use std::fmt::Display;

#[derive(Serialize)]
struct InfoJson<'a> {
    project_type: String,
    #[serde(flatten)]
    profile: &'a crate::detect::ProjectProfile,
    units: &'a [BuildUnit],
    suggested_strategy: String,
    skipped_files: usize,
}

/// Execute the info command
pub async fn execute(args: InfoArgs, config: &Config, ctx: &UiContext) -> PolybuildResult<()> {
    let analysis = project::analyze(&args.path, config)?;
    let units = analysis.units(config);

    match args.format {
        OutputFormat::Table => print_table(ctx, &analysis, &units),
        OutputFormat::Json => print_json(&analysis, &units)?,
        OutputFormat::Plain => print_plain(&analysis),
    }

    Ok(())
}

fn joined<T: Display>(items: &[T]) -> String {
    if items.is_empty() {
        return "none".to_string();
    }
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_table(ctx: &UiContext, analysis: &ProjectAnalysis, units: &[BuildUnit]) {
    let profile = &analysis.profile;

    ui::section(ctx, &analysis.root.display().to_string());
    ui::key_value(ctx, "Project type", &profile.project_type());
    ui::key_value(ctx, "Files", &profile.files_analyzed.to_string());
    ui::key_value(ctx, "Languages", &joined(&profile.languages));
    ui::key_value(ctx, "Frameworks", &joined(&profile.frameworks));
    ui::key_value(ctx, "Build tools", &joined(&profile.build_tools));

    ui::section(ctx, "Optimization");
    ui::key_value_status(
        ctx,
        "Parallel capable",
        &profile.hints.parallel_capable.to_string(),
        profile.hints.parallel_capable,
    );
    ui::key_value_status(
        ctx,
        "Incremental capable",
        &profile.hints.incremental_capable.to_string(),
        profile.hints.incremental_capable,
    );
    ui::key_value_status(
        ctx,
        "Cache beneficial",
        &profile.hints.cache_beneficial.to_string(),
        profile.hints.cache_beneficial,
    );
    ui::key_value(
        ctx,
        "Suggested strategy",
        select_strategy(&profile.hints, false).as_str(),
    );

    if !profile.dependencies.is_empty() {
        ui::section(ctx, "Dependencies");
        for (ecosystem, deps) in &profile.dependencies {
            ui::key_value(ctx, ecosystem, &format!("{} declared", deps.len()));
        }
    }

    ui::section(ctx, "Build units");
    if units.is_empty() {
        ui::step_warn_hint(
            ctx,
            "No build units",
            "Define units under [build.units] in .polybuild.toml",
        );
    }
    for unit in units {
        ui::key_value(ctx, &unit.name, &unit.commands.join(" && "));
    }
}

fn print_json(analysis: &ProjectAnalysis, units: &[BuildUnit]) -> PolybuildResult<()> {
    let info = InfoJson {
        project_type: analysis.profile.project_type(),
        profile: &analysis.profile,
        units,
        suggested_strategy: select_strategy(&analysis.profile.hints, false).to_string(),
        skipped_files: analysis.scan.skipped.len(),
    };
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn print_plain(analysis: &ProjectAnalysis) {
    println!("{}", analysis.profile.project_type());
    for tool in &analysis.profile.build_tools {
        println!("{}", tool);
    }
}
