//! Init command - create project-local .polybuild.toml

use crate::cli::args::InitArgs;
use crate::config::LOCAL_CONFIG_FILE;
use crate::error::{PolybuildError, PolybuildResult};
use crate::ui::{self, UiContext};
use tokio::fs;

/// Template for project-local config
const INIT_TEMPLATE: &str = r#"# Polybuild project configuration
# Settings here override your global config (~/.config/polybuild/config.toml)

[build]
# strategy = "adaptive"   # parallel, dependency_graph, incremental, cached, adaptive
# timeout_secs = 300
# jobs = 0                # 0 = one per CPU core
# fail_on_cycle = true

# Units that depend on other units
[build.dependencies]
# app = ["lib"]

# Extra units, or overrides for detected ones (cargo, npm, pip, ...)
# [build.units.lib]
# commands = ["make -C lib"]

[cache]
# enabled = true
# dir = ".polybuild/cache"
# gc_days = 30

[fingerprint]
# max_file_size_mb = 10
# ignore_dirs = [".git", "node_modules", "target", "build", "dist"]
"#;

/// Execute the init command
pub async fn execute(args: InitArgs, ctx: &UiContext) -> PolybuildResult<()> {
    let config_path = args.path.join(LOCAL_CONFIG_FILE);

    if config_path.exists() && !args.force {
        return Err(PolybuildError::User(format!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        )));
    }

    fs::create_dir_all(&args.path).await.map_err(|e| {
        PolybuildError::io(format!("creating directory {}", args.path.display()), e)
    })?;

    fs::write(&config_path, INIT_TEMPLATE)
        .await
        .map_err(|e| PolybuildError::io(format!("writing {}", config_path.display()), e))?;

    ui::step_ok_detail(
        ctx,
        "Created project config",
        &config_path.display().to_string(),
    );

    Ok(())
}
