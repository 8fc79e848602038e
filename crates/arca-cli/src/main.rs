//! # arca CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use arca_cli::freeze::{run_freeze, FreezeArgs};
use arca_cli::list::{run_history, run_names, run_versions, HistoryArgs};
use arca_cli::pull::{run_pull, PullArgs};
use arca_cli::push::{run_push, PushArgs};
use arca_cli::verify::run_verify;

/// Arca package repository CLI.
///
/// Works directly on a repository root: push packages, freeze versions,
/// list the catalog, pull bundles or single files, and verify storage.
#[derive(Parser, Debug)]
#[command(name = "arca", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Repository root directory.
    #[arg(long, global = true, env = "ARCA_ROOT", default_value = "./arca-data")]
    root: PathBuf,

    /// Accepted package file extension.
    #[arg(long, global = true, env = "ARCA_PACKAGE_EXTENSION", default_value = "apk")]
    extension: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload a package file.
    Push(PushArgs),

    /// Freeze the newest upload of every package name as a version.
    Freeze(FreezeArgs),

    /// List frozen versions, newest first.
    Versions,

    /// List package names with their newest upload.
    Names,

    /// Show the upload history of one package name.
    History(HistoryArgs),

    /// Pull a version bundle, or one package from it.
    Pull(PullArgs),

    /// Check catalogued artifacts against the content store.
    Verify,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("failed to start async runtime: {e}");
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    tracing::debug!(root = %cli.root.display(), "opening repository");
    let repo = arca_cli::open_repository(&cli.root, &cli.extension).await?;

    match &cli.command {
        Commands::Push(args) => run_push(args, &repo).await,
        Commands::Freeze(args) => run_freeze(args, &repo).await,
        Commands::Versions => run_versions(&repo).await,
        Commands::Names => run_names(&repo).await,
        Commands::History(args) => run_history(args, &repo).await,
        Commands::Pull(args) => run_pull(args, &repo).await,
        Commands::Verify => run_verify(&repo).await,
    }
}
