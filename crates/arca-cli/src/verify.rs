//! # Verify Subcommand
//!
//! Checks every catalogued artifact against the content store and looks for
//! stored files with no catalog row. Exits 1 on any divergence.

use anyhow::{Context, Result};

use arca_catalog::Repository;

pub async fn run_verify(repo: &Repository) -> Result<u8> {
    let report = repo.verify().await.context("storage verification failed")?;
    crate::print_json(&report)?;
    if report.is_clean() {
        Ok(0)
    } else {
        tracing::warn!(
            missing = report.missing_files.len(),
            corrupt = report.corrupt_files.len(),
            orphaned = report.orphan_files.len(),
            "repository storage is inconsistent"
        );
        Ok(1)
    }
}
