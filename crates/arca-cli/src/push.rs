//! # Push Subcommand

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use arca_catalog::{PushOutcome, Repository};

#[derive(Args, Debug)]
pub struct PushArgs {
    /// Package file to upload. Its stem becomes the package name.
    pub file: PathBuf,

    /// Free-text annotation stored with the upload.
    #[arg(short, long, default_value = "")]
    pub message: String,
}

/// Execute the push subcommand.
pub async fn run_push(args: &PushArgs, repo: &Repository) -> Result<u8> {
    let outcome = push_file(repo, &args.file, &args.message).await?;
    crate::print_json(&outcome)?;
    Ok(0)
}

pub async fn push_file(repo: &Repository, file: &Path, message: &str) -> Result<PushOutcome> {
    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("not a file path: {}", file.display()))?;
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let outcome = repo
        .push(filename, bytes, message)
        .await
        .with_context(|| format!("failed to push {}", file.display()))?;
    Ok(outcome)
}
