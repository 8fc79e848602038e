//! # Repository Facade
//!
//! Ties the content store, catalog, registry, freeze engine and resolver
//! together behind one handle. Both the HTTP server and the CLI work through
//! this type.
//!
//! Blocking filesystem work (store writes, bundle assembly, file reads) is
//! moved onto tokio's blocking pool here, so callers can stay async.
//!
//! ## Push ordering
//!
//! Bytes whose digest is already catalogued are reported as a duplicate of
//! the existing artifact without touching the store. Otherwise the file is
//! written (or confirmed present) before the catalog row is inserted. A
//! crash in between leaves an orphaned file, never a row that points at
//! nothing; [`Repository::verify`] reports such files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arca_core::{
    sha256_digest, Artifact, ContentDigest, NameHistory, NameSummary, PackageName,
    ValidationError, VersionName, VersionSelector, VersionSummary,
};
use arca_store::{BundleEntry, ContentStore, StoreError};
use serde::Serialize;
use sqlx::sqlite::SqlitePool;

use crate::catalog::{self, CatalogStats};
use crate::db::init_pool;
use crate::error::CatalogError;
use crate::freeze::{FreezeEngine, FreezeReport};
use crate::registry;
use crate::resolver::{self, ResolvedArtifact, ResolvedBundle};

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// On-disk layout under a repository root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLayout {
    root: PathBuf,
}

impl RepositoryLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{root}/repository`
    pub fn content_dir(&self) -> PathBuf {
        self.root.join("repository")
    }

    /// `{root}/database/catalog.db`
    pub fn database_path(&self) -> PathBuf {
        self.root.join("database").join("catalog.db")
    }
}

// ---------------------------------------------------------------------------
// Push
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PushStatus {
    Created,
    Duplicate,
}

/// Result of a push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushOutcome {
    pub status: PushStatus,
    pub name: PackageName,
    pub hash: ContentDigest,
    pub path: PathBuf,
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Result of a storage consistency check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub checked: usize,
    /// Catalogued artifacts whose file is absent.
    pub missing_files: Vec<Artifact>,
    /// Catalogued artifacts whose file no longer hashes to its address.
    pub corrupt_files: Vec<Artifact>,
    /// Stored files with no catalog row.
    pub orphan_files: Vec<PathBuf>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.missing_files.is_empty() && self.corrupt_files.is_empty() && self.orphan_files.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// Shared handle to one repository. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
    store: ContentStore,
    freezer: Arc<FreezeEngine>,
}

impl Repository {
    /// Open the repository at `layout`, creating directories and the catalog
    /// on first use.
    pub async fn open(layout: &RepositoryLayout, extension: &str) -> Result<Self, CatalogError> {
        let content_dir = layout.content_dir();
        tokio::fs::create_dir_all(&content_dir)
            .await
            .map_err(StoreError::from)?;
        let pool = init_pool(&layout.database_path()).await?;
        Ok(Self::from_parts(pool, ContentStore::new(content_dir, extension)))
    }

    pub fn from_parts(pool: SqlitePool, store: ContentStore) -> Self {
        Self {
            pool,
            store,
            freezer: Arc::new(FreezeEngine::new()),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Round-trip to the catalog database.
    pub async fn ping(&self) -> Result<(), CatalogError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Store an uploaded package and record it in the catalog.
    ///
    /// `filename` is the name the client uploaded under; its stem becomes the
    /// package name and its extension must match the store's.
    pub async fn push(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        annotation: &str,
    ) -> Result<PushOutcome, CatalogError> {
        let name = PackageName::from_filename(filename, self.store.extension())?;
        if bytes.is_empty() {
            return Err(ValidationError::EmptyPackage(filename.to_string()).into());
        }
        let hash = sha256_digest(&bytes);

        // Bytes already catalogued (under any name) are never written again.
        if let Some(existing) = catalog::artifact_by_hash(&self.pool, &hash).await? {
            tracing::info!(
                name = %existing.name,
                uploaded_as = %name,
                hash = %hash,
                status = ?PushStatus::Duplicate,
                "push"
            );
            return Ok(self.duplicate_of(existing));
        }

        let store = self.store.clone();
        let put_name = name.clone();
        let put = tokio::task::spawn_blocking(move || store.put(&put_name, &hash, &bytes))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))??;

        if !catalog::insert_artifact(&self.pool, &name, &hash, annotation).await? {
            // A concurrent push of the same bytes won the insert.
            let existing = catalog::artifact_by_hash(&self.pool, &hash)
                .await?
                .ok_or_else(|| CatalogError::ArtifactNotFound(name.clone()))?;
            if existing.name != name && put.newly_written {
                if let Err(e) = tokio::fs::remove_file(&put.path).await {
                    tracing::warn!(path = %put.path.display(), error = %e, "could not remove duplicate copy");
                }
            }
            tracing::info!(name = %existing.name, hash = %hash, status = ?PushStatus::Duplicate, "push");
            return Ok(self.duplicate_of(existing));
        }

        tracing::info!(
            name = %name,
            hash = %hash,
            status = ?PushStatus::Created,
            file_written = put.newly_written,
            "push"
        );

        Ok(PushOutcome {
            status: PushStatus::Created,
            name,
            hash,
            path: put.path,
        })
    }

    fn duplicate_of(&self, existing: Artifact) -> PushOutcome {
        PushOutcome {
            status: PushStatus::Duplicate,
            path: self.store.path_of(&existing.name, &existing.content_hash),
            hash: existing.content_hash,
            name: existing.name,
        }
    }

    pub async fn freeze(&self, version: &VersionName) -> Result<FreezeReport, CatalogError> {
        self.freezer.freeze(&self.pool, version).await
    }

    pub async fn versions(&self) -> Result<Vec<VersionSummary>, CatalogError> {
        registry::list_versions(&self.pool).await
    }

    pub async fn members_of(&self, version: &VersionName) -> Result<Vec<Artifact>, CatalogError> {
        registry::members_of(&self.pool, version).await
    }

    pub async fn names(&self) -> Result<Vec<NameSummary>, CatalogError> {
        catalog::list_distinct_names(&self.pool).await
    }

    pub async fn history(&self) -> Result<Vec<NameHistory>, CatalogError> {
        catalog::artifact_history(&self.pool).await
    }

    /// Upload history of `name`; [`CatalogError::ArtifactNotFound`] if it was
    /// never pushed.
    pub async fn name_history(&self, name: &PackageName) -> Result<NameHistory, CatalogError> {
        catalog::name_history(&self.pool, name)
            .await?
            .ok_or_else(|| CatalogError::ArtifactNotFound(name.clone()))
    }

    pub async fn stats(&self) -> Result<CatalogStats, CatalogError> {
        catalog::stats(&self.pool).await
    }

    pub async fn resolve_bundle(
        &self,
        selector: &VersionSelector,
    ) -> Result<ResolvedBundle, CatalogError> {
        resolver::resolve_version_bundle(&self.pool, &self.store, selector).await
    }

    pub async fn resolve_single(
        &self,
        selector: &VersionSelector,
        name: &PackageName,
    ) -> Result<ResolvedArtifact, CatalogError> {
        resolver::resolve_single_artifact(&self.pool, &self.store, selector, name).await
    }

    /// Resolve a version and pack its members into a `.tar.gz`.
    pub async fn bundle(
        &self,
        selector: &VersionSelector,
    ) -> Result<(VersionName, Vec<u8>), CatalogError> {
        let resolved = self.resolve_bundle(selector).await?;
        let entries: Vec<BundleEntry> = resolved
            .members
            .into_iter()
            .map(|m| BundleEntry::new(m.path, m.display_filename))
            .collect();

        let bytes = tokio::task::spawn_blocking(move || arca_store::assemble(&entries))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))??;

        Ok((resolved.version, bytes))
    }

    /// Resolve one package file and read its bytes.
    pub async fn fetch(
        &self,
        selector: &VersionSelector,
        name: &PackageName,
    ) -> Result<(ResolvedArtifact, Vec<u8>), CatalogError> {
        let resolved = self.resolve_single(selector, name).await?;
        let path = resolved.path.clone();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CatalogError::ArtifactFileMissing {
                    name: resolved.artifact.name.clone(),
                    hash: resolved.artifact.content_hash,
                })
            }
            Err(e) => return Err(StoreError::from(e).into()),
        };
        Ok((resolved, bytes))
    }

    /// Check every catalogued artifact against the content store, then walk
    /// the store for files the catalog does not know about.
    pub async fn verify(&self) -> Result<VerifyReport, CatalogError> {
        let artifacts = catalog::all_artifacts(&self.pool).await?;
        let store = self.store.clone();

        let report = tokio::task::spawn_blocking(move || {
            let mut report = VerifyReport {
                checked: artifacts.len(),
                ..VerifyReport::default()
            };
            let catalogued: HashSet<(PackageName, ContentDigest)> = artifacts
                .iter()
                .map(|a| (a.name.clone(), a.content_hash))
                .collect();
            for artifact in artifacts {
                match store.read_verified(&artifact.name, &artifact.content_hash) {
                    Ok(Some(_)) => {}
                    Ok(None) => report.missing_files.push(artifact),
                    Err(StoreError::Integrity { .. }) => report.corrupt_files.push(artifact),
                    Err(e) => return Err(e),
                }
            }
            for name in store.list_names()? {
                for hash in store.list_hashes(&name)? {
                    if !catalogued.contains(&(name.clone(), hash)) {
                        report.orphan_files.push(store.path_of(&name, &hash));
                    }
                }
            }
            Ok(report)
        })
        .await
        .map_err(|e| StoreError::Io(std::io::Error::other(e)))??;

        if !report.is_clean() {
            tracing::warn!(
                missing = report.missing_files.len(),
                corrupt = report.corrupt_files.len(),
                orphaned = report.orphan_files.len(),
                "repository storage diverges from catalog"
            );
        }
        Ok(report)
    }
}
