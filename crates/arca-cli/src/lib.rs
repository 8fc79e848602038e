//! # arca-cli: Command-Line Tool for Arca Repositories
//!
//! Operates directly on a repository root (the same directory the server's
//! `repository.root` points at), without going through HTTP.
//!
//! ```bash
//! arca --root /var/lib/arca push build/app.apk -m "nightly"
//! arca --root /var/lib/arca freeze r42
//! arca --root /var/lib/arca pull latest -o ./out
//! arca --root /var/lib/arca pull r42 app -o app.apk
//! arca --root /var/lib/arca verify
//! ```
//!
//! Every command prints JSON on stdout.

pub mod freeze;
pub mod list;
pub mod pull;
pub mod push;
pub mod verify;

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use arca_catalog::{Repository, RepositoryLayout};

/// Open (creating on first use) the repository at `root`.
pub async fn open_repository(root: &Path, extension: &str) -> Result<Repository> {
    Repository::open(&RepositoryLayout::new(root), extension)
        .await
        .with_context(|| format!("failed to open repository at {}", root.display()))
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{text}");
    Ok(())
}
