//! # Retrieval Resolver
//!
//! Turns a `(selector[, name])` query into stored file locations.
//!
//! | Query | Source of truth |
//! |---|---|
//! | bundle, `latest` | newest frozen version |
//! | bundle, `vN` | membership of `vN` |
//! | single, `latest` | newest push in the live catalog |
//! | single, `vN` | membership of `vN` |
//!
//! A single `latest` therefore may return an artifact that no frozen version
//! contains yet. Bundles only ever come from frozen snapshots.

use std::path::PathBuf;

use arca_core::{Artifact, PackageName, VersionName, VersionSelector};
use arca_store::ContentStore;
use sqlx::sqlite::SqlitePool;

use crate::catalog::latest_artifact_for;
use crate::error::CatalogError;
use crate::registry::{latest_version, member_named, members_of, version_exists};

/// An artifact together with where its bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub artifact: Artifact,
    pub path: PathBuf,
    /// `{name}.{ext}`, the filename clients receive.
    pub display_filename: String,
}

impl ResolvedArtifact {
    fn locate(store: &ContentStore, artifact: Artifact) -> Self {
        let path = store.path_of(&artifact.name, &artifact.content_hash);
        let display_filename = artifact.name.display_filename(store.extension());
        Self {
            artifact,
            path,
            display_filename,
        }
    }

    fn file_missing(&self) -> CatalogError {
        CatalogError::ArtifactFileMissing {
            name: self.artifact.name.clone(),
            hash: self.artifact.content_hash,
        }
    }
}

/// A resolved bundle: the concrete version and its members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBundle {
    pub version: VersionName,
    pub members: Vec<ResolvedArtifact>,
}

/// Resolve every member of a frozen version.
///
/// Members whose file is gone are kept in the result (the bundle assembler
/// skips them); only when no member file exists at all does this fail with
/// [`CatalogError::ArtifactFileMissing`].
pub async fn resolve_version_bundle(
    pool: &SqlitePool,
    store: &ContentStore,
    selector: &VersionSelector,
) -> Result<ResolvedBundle, CatalogError> {
    let version = match selector {
        VersionSelector::Latest => latest_version(pool)
            .await?
            .ok_or(CatalogError::NoFrozenVersions)?,
        VersionSelector::Named(v) => v.clone(),
    };

    let members = members_of(pool, &version).await?;
    if members.is_empty() {
        return Err(CatalogError::EmptyVersion(version));
    }

    let resolved: Vec<ResolvedArtifact> = members
        .into_iter()
        .map(|a| ResolvedArtifact::locate(store, a))
        .collect();

    let mut present = 0usize;
    for r in &resolved {
        if store.exists(&r.artifact.name, &r.artifact.content_hash) {
            present += 1;
        } else {
            tracing::warn!(
                version = %version,
                name = %r.artifact.name,
                hash = %r.artifact.content_hash,
                "version member recorded but file missing"
            );
        }
    }
    if present == 0 {
        return Err(resolved[0].file_missing());
    }

    Ok(ResolvedBundle {
        version,
        members: resolved,
    })
}

/// Resolve one package file.
pub async fn resolve_single_artifact(
    pool: &SqlitePool,
    store: &ContentStore,
    selector: &VersionSelector,
    name: &PackageName,
) -> Result<ResolvedArtifact, CatalogError> {
    let artifact = match selector {
        VersionSelector::Latest => latest_artifact_for(pool, name)
            .await?
            .ok_or_else(|| CatalogError::ArtifactNotFound(name.clone()))?,
        VersionSelector::Named(version) => match member_named(pool, version, name).await? {
            Some(a) => a,
            None if version_exists(pool, version).await? => {
                return Err(CatalogError::ArtifactNotInVersion {
                    version: version.clone(),
                    name: name.clone(),
                })
            }
            None => return Err(CatalogError::VersionNotFound(version.clone())),
        },
    };

    let resolved = ResolvedArtifact::locate(store, artifact);
    if !store.exists(&resolved.artifact.name, &resolved.artifact.content_hash) {
        return Err(resolved.file_missing());
    }
    Ok(resolved)
}
