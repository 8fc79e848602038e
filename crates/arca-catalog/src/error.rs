//! # Catalog Error Types
//!
//! Resolution misses (`VersionNotFound`, `EmptyVersion`, `NoFrozenVersions`,
//! `ArtifactNotFound`, `ArtifactNotInVersion`) are kept apart from storage
//! divergence (`ArtifactFileMissing`) so operators can tell "never recorded"
//! from "recorded but the file is gone".

use arca_core::{ContentDigest, PackageName, ValidationError, VersionName};
use arca_store::StoreError;
use thiserror::Error;

/// Errors from the catalog, registry, freeze engine and resolver.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// SQLite reported a failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Embedded schema migrations failed to apply.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Caller-supplied name or upload was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A uniqueness invariant of the registry would be violated.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("version {0} not found")]
    VersionNotFound(VersionName),

    #[error("version {0} has no members")]
    EmptyVersion(VersionName),

    #[error("no versions have been frozen")]
    NoFrozenVersions,

    #[error("no artifact named {0} has been pushed")]
    ArtifactNotFound(PackageName),

    #[error("version {version} does not contain {name}")]
    ArtifactNotInVersion {
        version: VersionName,
        name: PackageName,
    },

    /// The catalog references a file the content store does not have.
    #[error("artifact {name}@{hash} is recorded but its file is missing")]
    ArtifactFileMissing {
        name: PackageName,
        hash: ContentDigest,
    },

    /// A stored row no longer satisfies the domain type's validation.
    #[error("corrupt catalog row: {0}")]
    CorruptRow(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CatalogError {
    /// Whether this error means "the thing asked for does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::VersionNotFound(_)
                | Self::EmptyVersion(_)
                | Self::NoFrozenVersions
                | Self::ArtifactNotFound(_)
                | Self::ArtifactNotInVersion { .. }
                | Self::ArtifactFileMissing { .. }
        )
    }
}
