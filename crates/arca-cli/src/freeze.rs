//! # Freeze Subcommand

use anyhow::{Context, Result};
use clap::Args;

use arca_catalog::Repository;
use arca_core::VersionName;

#[derive(Args, Debug)]
pub struct FreezeArgs {
    /// Version name to freeze (re-freezing replaces its membership).
    pub version: String,
}

/// Execute the freeze subcommand.
pub async fn run_freeze(args: &FreezeArgs, repo: &Repository) -> Result<u8> {
    let version = VersionName::new(args.version.as_str())?;
    let report = repo
        .freeze(&version)
        .await
        .with_context(|| format!("failed to freeze {version}"))?;
    crate::print_json(&report)?;
    Ok(0)
}
