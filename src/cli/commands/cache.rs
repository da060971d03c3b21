//! Cache command - inspect and manage the project build cache

use super::project;
use crate::build::{BuildPlan, BuildRecord, FreshnessPolicy};
use crate::cache::{invalidate_cascade, CacheEntryInfo, CacheStore};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::Config;
use crate::error::{PolybuildError, PolybuildResult};
use crate::ui::{self, format_bytes, UiContext};
use console::style;
use std::path::Path;
use tracing::debug;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config, ctx: &UiContext) -> PolybuildResult<()> {
    if !config.cache.enabled {
        return Err(PolybuildError::CacheDisabled);
    }

    let root = project::resolve_root(&args.project)?;
    let dir = config.cache.resolve_dir(&root);
    debug!("Cache directory: {}", dir.display());

    match args.action {
        CacheAction::List { format } => list_entries(&dir, format),
        CacheAction::Status => show_status(ctx, &root, &dir, config),
        CacheAction::Invalidate {
            key,
            dependents,
            cascade,
        } => invalidate(ctx, &dir, &key, dependents, cascade),
        CacheAction::Clear { yes } => clear(ctx, &dir, yes).await,
        CacheAction::Gc { days, dry_run } => gc(ctx, &dir, config, days, dry_run),
    }
}

/// Open the store only if it already exists; read-only commands never create it
fn existing_store(dir: &Path) -> PolybuildResult<Option<CacheStore>> {
    if !dir.is_dir() {
        return Ok(None);
    }
    CacheStore::open(dir).map(Some)
}

fn list_entries(dir: &Path, format: OutputFormat) -> PolybuildResult<()> {
    let entries = match existing_store(dir)? {
        Some(store) => store.list()?,
        None => Vec::new(),
    };

    if entries.is_empty() && format != OutputFormat::Json {
        println!("No cache entries found.");
        return Ok(());
    }

    match format {
        OutputFormat::Table => print_entry_table(&entries),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Plain => {
            for entry in &entries {
                println!("{}", entry.key);
            }
        }
    }

    Ok(())
}

fn print_entry_table(entries: &[CacheEntryInfo]) {
    println!(
        "{:<30} {:<10} {:<18} {}",
        "KEY", "SIZE", "CREATED", "DEPENDS ON"
    );
    println!("{}", "-".repeat(80));

    for entry in entries {
        let size = match entry.size_bytes {
            Some(bytes) => format_bytes(bytes),
            None => style("missing").red().to_string(),
        };
        let deps = if entry.dependencies.is_empty() {
            "-".to_string()
        } else {
            entry.dependencies.join(", ")
        };
        println!(
            "{:<30} {:<10} {:<18} {}",
            entry.key,
            size,
            entry.created_at.format("%Y-%m-%d %H:%M"),
            deps
        );
    }

    println!();
    println!("Total: {} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
}

/// Location, usage, and per-unit freshness for the current project state
fn show_status(ctx: &UiContext, root: &Path, dir: &Path, config: &Config) -> PolybuildResult<()> {
    ui::section(ctx, "Cache");
    ui::key_value(ctx, "Location", &dir.display().to_string());

    let Some(store) = existing_store(dir)? else {
        ui::key_value_status(ctx, "State", "empty (no builds recorded)", false);
        return Ok(());
    };

    let stats = store.stats()?;
    ui::key_value(ctx, "Entries", &stats.entries.to_string());
    ui::key_value(ctx, "Size", &format_bytes(stats.total_bytes));
    if stats.dangling > 0 {
        ui::key_value_status(ctx, "Dangling", &stats.dangling.to_string(), false);
    }

    let analysis = project::analyze(root, config)?;
    let units = analysis.units(config);
    if units.is_empty() {
        return Ok(());
    }
    let plan = BuildPlan::new(units, &config.build.dependencies);

    ui::section(ctx, "Units");
    for unit in plan.ordered_units() {
        let record: Option<BuildRecord> = store.get(&unit.cache_key())?;
        match record {
            Some(record)
                if record.is_fresh_for(
                    &unit.commands,
                    &analysis.scan.signature,
                    FreshnessPolicy::Exact,
                ) =>
            {
                ui::key_value_status(ctx, &unit.name, "fresh", true)
            }
            Some(record) => {
                let changed = record
                    .signature
                    .changed_paths(&analysis.scan.signature)
                    .len();
                ui::key_value_status(
                    ctx,
                    &unit.name,
                    &format!("stale ({} files changed)", changed),
                    false,
                )
            }
            None => ui::key_value_status(ctx, &unit.name, "not cached", false),
        }
    }

    Ok(())
}

fn invalidate(
    ctx: &UiContext,
    dir: &Path,
    key: &str,
    dependents: bool,
    cascade: bool,
) -> PolybuildResult<()> {
    let Some(store) = existing_store(dir)? else {
        return Err(PolybuildError::CacheEntryNotFound(key.to_string()));
    };

    let removed = if cascade {
        invalidate_cascade(&store, key)?
    } else {
        let mut removed = Vec::new();
        if store.invalidate(key)? {
            removed.push(key.to_string());
        }
        if dependents {
            removed.extend(store.invalidate_dependents(key)?);
        }
        removed
    };

    if removed.is_empty() {
        return Err(PolybuildError::CacheEntryNotFound(key.to_string()));
    }

    for key in &removed {
        ui::step_ok(ctx, &format!("Invalidated {}", key));
    }
    Ok(())
}

async fn clear(ctx: &UiContext, dir: &Path, yes: bool) -> PolybuildResult<()> {
    let store = match existing_store(dir)? {
        Some(store) => store,
        None => {
            println!("No cache entries to clear.");
            return Ok(());
        }
    };

    let entries = store.list()?.len();
    if entries == 0 {
        println!("No cache entries to clear.");
        return Ok(());
    }

    let ctx = ctx.clone().with_auto_yes(yes);
    let message = format!("Remove {} cache entries from {}?", entries, dir.display());
    if !ui::confirm(&ctx, &message, false).await? {
        println!("Aborted.");
        return Ok(());
    }

    let removed = store.clear()?;
    ui::step_ok(&ctx, &format!("Cleared {} cache entries", removed));
    Ok(())
}

fn gc(
    ctx: &UiContext,
    dir: &Path,
    config: &Config,
    days_override: Option<u32>,
    dry_run: bool,
) -> PolybuildResult<()> {
    let gc_days = days_override.unwrap_or(config.cache.gc_days);
    if gc_days == 0 {
        println!("Cache GC is disabled (gc_days = 0)");
        return Ok(());
    }

    let Some(store) = existing_store(dir)? else {
        println!("No cache entries found.");
        return Ok(());
    };

    let expired = store.gc(chrono::Duration::days(gc_days as i64), dry_run)?;
    if expired.is_empty() {
        println!("No entries older than {} days.", gc_days);
    } else {
        println!(
            "{} {} entr{} older than {} days:",
            if dry_run { "Would remove" } else { "Removed" },
            expired.len(),
            if expired.len() == 1 { "y" } else { "ies" },
            gc_days
        );
        for key in &expired {
            println!("  {} {}", style("•").red(), key);
        }
    }

    if dry_run {
        println!();
        println!("Dry run - nothing removed.");
        return Ok(());
    }

    let pruned = store.prune_orphans()?;
    if pruned > 0 {
        ui::step_ok(ctx, &format!("Pruned {} orphaned payload file(s)", pruned));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const NO_DEPS: [&str; 0] = [];

    fn seeded() -> (TempDir, PathBuf, CacheStore) {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("cache");
        let store = CacheStore::open(&dir).unwrap();
        store.set("build/lib", &"lib", NO_DEPS).unwrap();
        store.set("build/app", &"app", ["build/lib"]).unwrap();
        store.set("build/cli", &"cli", ["build/app"]).unwrap();
        (temp, dir, store)
    }

    #[test]
    fn invalidate_single_key_only() {
        let (_temp, dir, store) = seeded();
        let ctx = UiContext::non_interactive();

        invalidate(&ctx, &dir, "build/lib", false, false).unwrap();
        assert!(store.entry("build/lib").unwrap().is_none());
        assert!(store.entry("build/app").unwrap().is_some());
    }

    #[test]
    fn invalidate_dependents_is_one_level() {
        let (_temp, dir, store) = seeded();
        let ctx = UiContext::non_interactive();

        invalidate(&ctx, &dir, "build/lib", true, false).unwrap();
        assert!(store.entry("build/app").unwrap().is_none());
        assert!(store.entry("build/cli").unwrap().is_some());
    }

    #[test]
    fn invalidate_cascade_reaches_everything() {
        let (_temp, dir, store) = seeded();
        let ctx = UiContext::non_interactive();

        invalidate(&ctx, &dir, "build/lib", false, true).unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn invalidate_unknown_key_is_not_found() {
        let (_temp, dir, _store) = seeded();
        let ctx = UiContext::non_interactive();

        let err = invalidate(&ctx, &dir, "build/none", false, false).unwrap_err();
        assert!(matches!(err, PolybuildError::CacheEntryNotFound(_)));
    }

    #[tokio::test]
    async fn clear_requires_confirmation() {
        let (_temp, dir, store) = seeded();
        let ctx = UiContext::non_interactive();

        clear(&ctx, &dir, false).await.unwrap();
        assert_eq!(store.list().unwrap().len(), 3);

        clear(&ctx, &dir, true).await.unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn read_only_commands_do_not_create_the_store() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("cache");

        list_entries(&dir, OutputFormat::Table).unwrap();
        gc(&UiContext::non_interactive(), &dir, &Config::default(), None, false).unwrap();
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn disabled_cache_is_an_error() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.cache.enabled = false;

        let args = CacheArgs {
            project: temp.path().to_path_buf(),
            action: CacheAction::List {
                format: OutputFormat::Plain,
            },
        };
        let err = execute(args, &config, &UiContext::non_interactive())
            .await
            .unwrap_err();
        assert!(matches!(err, PolybuildError::CacheDisabled));
    }
}
