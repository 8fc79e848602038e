//! Row types read back from SQLite and their conversion into domain records.
//!
//! Stored strings are re-validated on the way out; a row that no longer
//! parses surfaces as [`CatalogError::CorruptRow`].

use arca_core::{Artifact, ContentDigest, PackageName, VersionName};

use crate::db::from_micros;
use crate::error::CatalogError;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ArtifactRow {
    pub id: i64,
    pub name: String,
    pub content_hash: String,
    pub annotation: String,
    pub uploaded_at: i64,
}

impl ArtifactRow {
    pub fn into_artifact(self) -> Result<Artifact, CatalogError> {
        Ok(Artifact {
            name: parse_name(&self.name)?,
            content_hash: parse_hash(&self.content_hash)?,
            annotation: self.annotation,
            uploaded_at: from_micros(self.uploaded_at)?,
        })
    }
}

pub(crate) fn parse_name(raw: &str) -> Result<PackageName, CatalogError> {
    PackageName::new(raw).map_err(|e| CatalogError::CorruptRow(e.to_string()))
}

pub(crate) fn parse_hash(raw: &str) -> Result<ContentDigest, CatalogError> {
    ContentDigest::from_hex(raw).map_err(|e| CatalogError::CorruptRow(e.to_string()))
}

pub(crate) fn parse_version(raw: &str) -> Result<VersionName, CatalogError> {
    VersionName::new(raw).map_err(|e| CatalogError::CorruptRow(e.to_string()))
}

pub(crate) fn into_artifacts(rows: Vec<ArtifactRow>) -> Result<Vec<Artifact>, CatalogError> {
    rows.into_iter().map(ArtifactRow::into_artifact).collect()
}
