//! # Pull Subcommand
//!
//! Without a package name, the version's bundle is extracted into `-o`
//! (default: a directory named after the version). With a name, the single
//! file is written to `-o` (default: `{name}.{extension}` in the current
//! directory).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use arca_catalog::Repository;
use arca_core::{PackageName, VersionSelector};

#[derive(Args, Debug)]
pub struct PullArgs {
    /// Version name, or `latest`.
    pub version: String,

    /// Pull only this package instead of the whole bundle.
    pub name: Option<String>,

    /// Output directory (bundle) or file (single package).
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct PulledBundle {
    pub version: String,
    pub directory: PathBuf,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct PulledFile {
    pub name: String,
    pub hash: String,
    pub file: PathBuf,
}

/// Execute the pull subcommand.
pub async fn run_pull(args: &PullArgs, repo: &Repository) -> Result<u8> {
    let selector = VersionSelector::parse(&args.version)?;
    match &args.name {
        None => {
            let pulled = pull_bundle(repo, &selector, args.out.as_deref()).await?;
            crate::print_json(&pulled)?;
        }
        Some(name) => {
            let name = PackageName::new(name.as_str())?;
            let pulled = pull_file(repo, &selector, &name, args.out.as_deref()).await?;
            crate::print_json(&pulled)?;
        }
    }
    Ok(0)
}

pub async fn pull_bundle(
    repo: &Repository,
    selector: &VersionSelector,
    out: Option<&Path>,
) -> Result<PulledBundle> {
    let (version, bytes) = repo
        .bundle(selector)
        .await
        .with_context(|| format!("failed to build bundle for {selector}"))?;
    let directory = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(version.as_str()));

    let dest = directory.clone();
    let files = tokio::task::spawn_blocking(move || arca_store::unpack(&bytes, &dest))
        .await
        .context("bundle extraction task failed")?
        .with_context(|| format!("failed to extract bundle into {}", directory.display()))?;

    tracing::info!(version = %version, files = files.len(), "bundle extracted");
    Ok(PulledBundle {
        version: version.to_string(),
        directory,
        files,
    })
}

pub async fn pull_file(
    repo: &Repository,
    selector: &VersionSelector,
    name: &PackageName,
    out: Option<&Path>,
) -> Result<PulledFile> {
    let (resolved, bytes) = repo
        .fetch(selector, name)
        .await
        .with_context(|| format!("failed to fetch {name} at {selector}"))?;
    let file = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&resolved.display_filename));
    tokio::fs::write(&file, &bytes)
        .await
        .with_context(|| format!("failed to write {}", file.display()))?;

    Ok(PulledFile {
        name: resolved.artifact.name.to_string(),
        hash: resolved.artifact.content_hash.to_hex(),
        file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arca_core::VersionName;

    async fn seeded() -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = crate::open_repository(&dir.path().join("repo"), "apk").await.unwrap();
        repo.push("app.apk", b"app-1".to_vec(), "").await.unwrap();
        repo.push("lib.apk", b"lib-1".to_vec(), "").await.unwrap();
        repo.freeze(&VersionName::new("r1").unwrap()).await.unwrap();
        repo.push("app.apk", b"app-2".to_vec(), "").await.unwrap();
        (dir, repo)
    }

    #[tokio::test]
    async fn bundle_extracts_version_members() {
        let (dir, repo) = seeded().await;
        let out = dir.path().join("out");
        let pulled = pull_bundle(&repo, &VersionSelector::Latest, Some(&out)).await.unwrap();
        assert_eq!(pulled.version, "r1");
        assert_eq!(pulled.files.len(), 2);
        assert_eq!(std::fs::read(out.join("app.apk")).unwrap(), b"app-1");
        assert_eq!(std::fs::read(out.join("lib.apk")).unwrap(), b"lib-1");
    }

    #[tokio::test]
    async fn single_file_latest_reads_live_catalog() {
        let (dir, repo) = seeded().await;
        let out = dir.path().join("pulled.apk");
        let name = PackageName::new("app").unwrap();
        let pulled = pull_file(&repo, &VersionSelector::Latest, &name, Some(&out))
            .await
            .unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"app-2");
        assert_eq!(pulled.hash, arca_core::sha256_digest(b"app-2").to_hex());
    }

    #[tokio::test]
    async fn unknown_version_fails() {
        let (dir, repo) = seeded().await;
        let selector = VersionSelector::parse("r9").unwrap();
        assert!(pull_bundle(&repo, &selector, Some(&dir.path().join("x")))
            .await
            .is_err());
    }
}
