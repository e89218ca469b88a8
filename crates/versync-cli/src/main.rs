mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use output::PlainPresenter;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "versync",
    about = "Keep language and tool versions in sync with the versions.yml registry",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from versions.yml or .git/)
    #[arg(long, global = true, env = "VERSYNC_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the version for a registry key (e.g. "tools.golangci-lint")
    Get { key: String },

    /// List every version in the registry
    List,

    /// Emit every registry entry as an environment-variable export
    Env,

    /// Emit the curated set of well-known versions as exports (for shell sourcing)
    Load,

    /// Rewrite target files whose embedded versions drifted from the registry
    Sync {
        /// Report what would change without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Report every drifted match and exit non-zero; never writes
        #[arg(long)]
        check: bool,

        /// Enable verbose output
        #[arg(long, short)]
        verbose: bool,
    },

    /// Compare installed tool versions against the registry
    Verify {
        /// Install the registry version for drifted tools that support it
        #[arg(long)]
        fix: bool,

        /// Report registry versions behind the upstream package index (read-only)
        #[arg(long)]
        check_outdated: bool,

        /// Enable verbose output
        #[arg(long, short)]
        verbose: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Sync { verbose: true, .. } | Commands::Verify { verbose: true, .. } => {
            tracing::Level::DEBUG
        }
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let presenter = PlainPresenter;

    let result = match cli.command {
        Commands::Get { key } => cmd::registry::get(&root, &key, cli.json),
        Commands::List => cmd::registry::list(&root, cli.json),
        Commands::Env => cmd::registry::env(&root),
        Commands::Load => cmd::registry::load(&root),
        Commands::Sync {
            dry_run, check, ..
        } => cmd::sync::run(&root, dry_run, check, cli.json, &presenter),
        Commands::Verify {
            fix,
            check_outdated,
            ..
        } => cmd::verify::run(&root, fix, check_outdated, cli.json, &presenter),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
