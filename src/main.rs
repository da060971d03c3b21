//! Polybuild - polyglot build orchestrator
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use polybuild::cli::{commands, Cli, Commands};
use polybuild::config::{Config, ConfigManager};
use polybuild::error::{PolybuildError, PolybuildResult};
use polybuild::ui::{self, UiContext};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> PolybuildResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    // Local config is looked up from the project the command targets
    let project = if cli.no_local {
        None
    } else {
        match cli.command.project_dir() {
            Some(dir) => Some(dir.to_path_buf()),
            None => Some(
                std::env::current_dir()
                    .map_err(|e| PolybuildError::io("getting current directory", e))?,
            ),
        }
    };
    let config = config_manager.load_merged(project.as_deref()).await?;

    init_logging(cli.verbose, &config);
    if cli.no_local {
        debug!("Local config discovery disabled (--no-local)");
    }

    let ctx = UiContext::detect().with_plain(cli.plain);
    if ctx.use_fancy_output() {
        ui::init_theme();
    }

    match cli.command {
        Commands::Build(args) => commands::build(args, &config, &ctx).await,
        Commands::Info(args) => commands::info(args, &config, &ctx).await,
        Commands::Signature(args) => commands::signature(args, &config).await,
        Commands::Order(args) => commands::order(args).await,
        Commands::Cache(args) => commands::cache(args, &config, &ctx).await,
        Commands::Stats(args) => commands::stats(args, &config).await,
        Commands::Config(args) => commands::config(args, &config, &config_manager, &ctx).await,
        Commands::Init(args) => commands::init(args, &ctx).await,
        Commands::Completions(args) => {
            commands::completions(args);
            Ok(())
        }
    }
}

/// 0 = warn, 1 = info, 2+ = debug; `general.log_format = "json"` for JSON lines
fn init_logging(verbose: u8, config: &Config) {
    let filter = match verbose {
        0 => EnvFilter::new("polybuild=warn"),
        1 => EnvFilter::new("polybuild=info"),
        _ => EnvFilter::new("polybuild=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
