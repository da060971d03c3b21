//! CLI argument definitions using clap derive

use crate::strategy::BuildStrategy;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::{Path, PathBuf};

/// Polybuild - polyglot build orchestrator
///
/// Detects the languages and build tools a project uses, builds it with a
/// strategy picked from project shape and history, and skips work whose
/// inputs have not changed.
#[derive(Parser, Debug)]
#[command(name = "polybuild")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "POLYBUILD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local .polybuild.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,

    /// Plain output even on a terminal (no spinners or prompts)
    #[arg(long, global = true)]
    pub plain: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze and build a project
    Build(BuildArgs),

    /// Show what detection found in a project
    Info(InfoArgs),

    /// Print the content signature of a project
    Signature(SignatureArgs),

    /// Order a dependency file and report cycles
    Order(OrderArgs),

    /// Inspect and manage the build cache
    Cache(CacheArgs),

    /// Show build history statistics
    Stats(StatsArgs),

    /// Show or edit configuration
    Config(ConfigArgs),

    /// Initialize a project-local .polybuild.toml config
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

impl Commands {
    /// Project directory the command operates on, if any
    pub fn project_dir(&self) -> Option<&Path> {
        match self {
            Self::Build(args) => Some(args.path.as_path()),
            Self::Info(args) => Some(args.path.as_path()),
            Self::Signature(args) => Some(args.path.as_path()),
            Self::Cache(args) => Some(args.project.as_path()),
            Self::Init(args) => Some(args.path.as_path()),
            Self::Order(_) | Self::Stats(_) | Self::Config(_) | Self::Completions(_) => None,
        }
    }
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Project directory
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Build strategy (default: from config)
    #[arg(short, long)]
    pub strategy: Option<BuildStrategy>,

    /// Ignore and do not update the build cache
    #[arg(long)]
    pub no_cache: bool,

    /// Per-command timeout in seconds (default: from config)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Maximum concurrent units for the parallel strategy
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Show the plan without running anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the info command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Project directory
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the signature command
#[derive(Parser, Debug)]
pub struct SignatureArgs {
    /// Project directory
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "plain")]
    pub format: OutputFormat,
}

/// Arguments for the order command
#[derive(Parser, Debug)]
pub struct OrderArgs {
    /// JSON or TOML file mapping each node to the nodes it depends on
    pub file: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "plain")]
    pub format: OutputFormat,

    /// Exit with an error when cycles are found
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the stats command
#[derive(Parser, Debug)]
pub struct StatsArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the init command
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Overwrite existing .polybuild.toml
    #[arg(short, long)]
    pub force: bool,

    /// Target directory
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,
}

/// Arguments for the completions command
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: Shell,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for listing commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Project directory whose cache to use
    #[arg(short, long, global = true, default_value = ".")]
    pub project: PathBuf,

    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cached entries
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show cache location, size, and freshness for the project
    Status,

    /// Remove one entry
    Invalidate {
        /// Cache key (e.g. build/cargo)
        key: String,

        /// Also remove entries that directly depend on the key
        #[arg(long)]
        dependents: bool,

        /// Also remove everything that transitively depends on the key
        #[arg(long, conflicts_with = "dependents")]
        cascade: bool,
    },

    /// Remove all entries
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Remove old entries and orphaned payloads
    Gc {
        /// Remove entries older than N days (default: from config)
        #[arg(long)]
        days: Option<u32>,

        /// Dry run - show what would be removed
        #[arg(long)]
        dry_run: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_build_defaults() {
        let cli = Cli::parse_from(["polybuild", "build"]);
        match cli.command {
            Commands::Build(args) => {
                assert_eq!(args.path, PathBuf::from("."));
                assert!(args.strategy.is_none());
                assert!(!args.no_cache);
                assert!(!args.dry_run);
            }
            _ => panic!("expected Build command"),
        }
    }

    #[test]
    fn cli_parses_build_with_flags() {
        let cli = Cli::parse_from([
            "polybuild",
            "build",
            "app",
            "--strategy",
            "dependency_graph",
            "--jobs",
            "4",
            "--timeout",
            "60",
            "--no-cache",
        ]);
        match cli.command {
            Commands::Build(args) => {
                assert_eq!(args.path, PathBuf::from("app"));
                assert_eq!(args.strategy, Some(BuildStrategy::DependencyGraph));
                assert_eq!(args.jobs, Some(4));
                assert_eq!(args.timeout, Some(60));
                assert!(args.no_cache);
            }
            _ => panic!("expected Build command"),
        }
    }

    #[test]
    fn cli_rejects_unknown_strategy() {
        assert!(Cli::try_parse_from(["polybuild", "build", "--strategy", "turbo"]).is_err());
    }

    #[test]
    fn cli_parses_cache_invalidate() {
        let cli = Cli::parse_from([
            "polybuild",
            "cache",
            "--project",
            "app",
            "invalidate",
            "build/npm",
            "--cascade",
        ]);
        match cli.command {
            Commands::Cache(args) => {
                assert_eq!(args.project, PathBuf::from("app"));
                match args.action {
                    CacheAction::Invalidate {
                        key,
                        dependents,
                        cascade,
                    } => {
                        assert_eq!(key, "build/npm");
                        assert!(!dependents);
                        assert!(cascade);
                    }
                    _ => panic!("expected Invalidate action"),
                }
            }
            _ => panic!("expected Cache command"),
        }
    }

    #[test]
    fn cli_rejects_dependents_with_cascade() {
        let result = Cli::try_parse_from([
            "polybuild",
            "cache",
            "invalidate",
            "k",
            "--dependents",
            "--cascade",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_parses_order_strict() {
        let cli = Cli::parse_from(["polybuild", "order", "deps.json", "--strict"]);
        match cli.command {
            Commands::Order(args) => {
                assert_eq!(args.file, PathBuf::from("deps.json"));
                assert!(args.strict);
                assert_eq!(args.format, OutputFormat::Plain);
            }
            _ => panic!("expected Order command"),
        }
    }

    #[test]
    fn project_dir_per_command() {
        let cli = Cli::parse_from(["polybuild", "info", "svc"]);
        assert_eq!(cli.command.project_dir(), Some(Path::new("svc")));

        let cli = Cli::parse_from(["polybuild", "stats"]);
        assert!(cli.command.project_dir().is_none());
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from(["polybuild", "-vv", "--plain", "--no-local", "stats"]);
        assert_eq!(cli.verbose, 2);
        assert!(cli.plain);
        assert!(cli.no_local);
    }
}
