//! Stats command - summarize build history

use crate::cli::args::{OutputFormat, StatsArgs};
use crate::config::Config;
use crate::error::PolybuildResult;
use crate::history::{best_strategy, BuildHistory, BuildMetrics, BuildStatistics};
use crate::strategy::BuildStrategy;
use crate::ui::format_duration;
use console::style;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Builds shown in the "recent" table
const RECENT_BUILDS: usize = 10;

#[derive(Serialize)]
struct StatsJson<'a> {
    #[serde(flatten)]
    statistics: BuildStatistics,
    best_strategy: BTreeMap<&'a str, BuildStrategy>,
    recent: &'a [BuildMetrics],
}

/// Execute the stats command
pub async fn execute(args: StatsArgs, config: &Config) -> PolybuildResult<()> {
    let history = BuildHistory::new(config);
    let records = history.load().await;

    if !config.general.history {
        println!("Build history is disabled (general.history = false)");
    }

    let statistics = BuildStatistics::from_records(&records);
    let learned = learned_strategies(&records);
    let recent = &records[records.len().saturating_sub(RECENT_BUILDS)..];

    match args.format {
        OutputFormat::Table => print_table(&statistics, &learned, recent),
        OutputFormat::Json => {
            let json = StatsJson {
                statistics,
                best_strategy: learned,
                recent,
            };
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Plain => {
            println!("builds {}", statistics.total_builds);
            println!("success_rate {:.2}", statistics.success_rate);
            println!("average_secs {:.2}", statistics.average_duration_secs);
            println!("cache_hit_rate {:.2}", statistics.cache_hit_rate);
        }
    }

    Ok(())
}

/// Best strategy per project type seen in the history
fn learned_strategies(records: &[BuildMetrics]) -> BTreeMap<&str, BuildStrategy> {
    let mut learned = BTreeMap::new();
    for record in records {
        let project_type = record.project_type.as_str();
        if learned.contains_key(project_type) {
            continue;
        }
        if let Some(strategy) = best_strategy(records, project_type) {
            learned.insert(project_type, strategy);
        }
    }
    learned
}

fn print_table(
    statistics: &BuildStatistics,
    learned: &BTreeMap<&str, BuildStrategy>,
    recent: &[BuildMetrics],
) {
    if statistics.total_builds == 0 {
        println!("No builds recorded yet.");
        return;
    }

    println!("{}", style("Summary").bold());
    println!("  Builds:         {}", statistics.total_builds);
    println!(
        "  Success rate:   {:.1}% ({} ok)",
        statistics.success_rate * 100.0,
        statistics.successful_builds
    );
    println!(
        "  Average time:   {}",
        format_duration(Duration::from_secs_f64(statistics.average_duration_secs))
    );
    println!("  Cache hit rate: {:.1}%", statistics.cache_hit_rate * 100.0);

    if !learned.is_empty() {
        println!();
        println!("{}", style("Best strategy by project type").bold());
        for (project_type, strategy) in learned {
            println!("  {:<28} {}", project_type, strategy);
        }
    }

    println!();
    println!(
        "{:<18} {:<24} {:<18} {:<10} {}",
        "STARTED", "PROJECT", "STRATEGY", "TIME", "RESULT"
    );
    println!("{}", "-".repeat(80));
    for record in recent.iter().rev() {
        let result = match (record.success, record.cache_hit) {
            (true, true) => style("cached").cyan().to_string(),
            (true, false) => style("ok").green().to_string(),
            (false, _) => style("failed").red().to_string(),
        };
        println!(
            "{:<18} {:<24} {:<18} {:<10} {}",
            record.started_at.format("%Y-%m-%d %H:%M"),
            record.project_type,
            record.strategy.as_str(),
            format_duration(Duration::from_millis(record.duration_ms)),
            result
        );
    }
}
