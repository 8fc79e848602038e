//! # Listing Subcommands
//!
//! `versions`, `names` and `history <NAME>`.

use anyhow::Result;
use clap::Args;

use arca_catalog::Repository;
use arca_core::PackageName;

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Package name.
    pub name: String,
}

pub async fn run_versions(repo: &Repository) -> Result<u8> {
    crate::print_json(&repo.versions().await?)?;
    Ok(0)
}

pub async fn run_names(repo: &Repository) -> Result<u8> {
    crate::print_json(&repo.names().await?)?;
    Ok(0)
}

pub async fn run_history(args: &HistoryArgs, repo: &Repository) -> Result<u8> {
    let name = PackageName::new(args.name.as_str())?;
    crate::print_json(&repo.name_history(&name).await?)?;
    Ok(0)
}
