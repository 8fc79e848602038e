//! # Version Registry
//!
//! Named snapshots of the catalog. A version row is created once and keeps
//! its `created_at`; re-freezing the same name replaces its membership, not
//! the row itself.
//!
//! Membership carries the artifact's `name` so the "one artifact per name
//! per version" rule is a unique key `(version_id, name)` rather than a
//! check in application code.

use arca_core::{Artifact, PackageName, VersionName, VersionSummary};
use sqlx::sqlite::{SqliteExecutor, SqlitePool};

use crate::db::{from_micros, now_micros};
use crate::error::CatalogError;
use crate::rows::{into_artifacts, parse_version, ArtifactRow};

/// Create the version row if it does not exist. Returns `true` when a row
/// was created.
pub async fn ensure_version(
    executor: impl SqliteExecutor<'_>,
    version: &VersionName,
) -> Result<bool, CatalogError> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO versions (version, created_at)
         VALUES (?1, MAX(?2, (SELECT COALESCE(MAX(created_at), 0) FROM versions)))",
    )
    .bind(version.as_str())
    .bind(now_micros())
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Drop every membership of `version`. Only the freeze engine calls this,
/// inside its transaction.
pub(crate) async fn clear_membership(
    executor: impl SqliteExecutor<'_>,
    version: &VersionName,
) -> Result<u64, CatalogError> {
    let result = sqlx::query(
        "DELETE FROM version_members
         WHERE version_id = (SELECT id FROM versions WHERE version = ?1)",
    )
    .bind(version.as_str())
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Add `artifact` to `version`.
///
/// Fails with [`CatalogError::Conflict`] when the version already holds an
/// artifact of the same name, or when either side is not recorded.
pub async fn add_membership(
    executor: impl SqliteExecutor<'_>,
    version: &VersionName,
    artifact: &Artifact,
) -> Result<(), CatalogError> {
    let result = sqlx::query(
        "INSERT INTO version_members (version_id, artifact_id, name)
         SELECT v.id, a.id, a.name
         FROM versions v, artifacts a
         WHERE v.version = ?1 AND a.content_hash = ?2",
    )
    .bind(version.as_str())
    .bind(artifact.content_hash.to_hex())
    .execute(executor)
    .await
    .map_err(|e| {
        if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
            CatalogError::Conflict(format!(
                "version {version} already has a member named {}",
                artifact.name
            ))
        } else {
            CatalogError::Database(e)
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(CatalogError::Conflict(format!(
            "cannot add {}@{} to {version}: version or artifact is not recorded",
            artifact.name, artifact.content_hash
        )));
    }
    Ok(())
}

pub async fn version_exists(
    executor: impl SqliteExecutor<'_>,
    version: &VersionName,
) -> Result<bool, CatalogError> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM versions WHERE version = ?1")
        .bind(version.as_str())
        .fetch_optional(executor)
        .await?;
    Ok(row.is_some())
}

/// Members of `version`, ordered by name.
pub async fn members_of(
    pool: &SqlitePool,
    version: &VersionName,
) -> Result<Vec<Artifact>, CatalogError> {
    if !version_exists(pool, version).await? {
        return Err(CatalogError::VersionNotFound(version.clone()));
    }
    members_in(pool, version).await
}

/// Member rows of `version` without the existence check. Usable inside a
/// transaction.
pub(crate) async fn members_in(
    executor: impl SqliteExecutor<'_>,
    version: &VersionName,
) -> Result<Vec<Artifact>, CatalogError> {
    let rows = sqlx::query_as::<_, ArtifactRow>(
        "SELECT a.id, a.name, a.content_hash, a.annotation, a.uploaded_at
         FROM version_members m
         JOIN versions v ON v.id = m.version_id
         JOIN artifacts a ON a.id = m.artifact_id
         WHERE v.version = ?1
         ORDER BY a.name",
    )
    .bind(version.as_str())
    .fetch_all(executor)
    .await?;

    into_artifacts(rows)
}

/// The member of `version` named `name`, if any. Does not check that the
/// version exists.
pub async fn member_named(
    pool: &SqlitePool,
    version: &VersionName,
    name: &PackageName,
) -> Result<Option<Artifact>, CatalogError> {
    let row = sqlx::query_as::<_, ArtifactRow>(
        "SELECT a.id, a.name, a.content_hash, a.annotation, a.uploaded_at
         FROM version_members m
         JOIN versions v ON v.id = m.version_id
         JOIN artifacts a ON a.id = m.artifact_id
         WHERE v.version = ?1 AND m.name = ?2",
    )
    .bind(version.as_str())
    .bind(name.as_str())
    .fetch_optional(pool)
    .await?;

    row.map(ArtifactRow::into_artifact).transpose()
}

/// Most recently created version.
pub async fn latest_version(pool: &SqlitePool) -> Result<Option<VersionName>, CatalogError> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT version FROM versions ORDER BY created_at DESC, id DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    row.map(|(v,)| parse_version(&v)).transpose()
}

#[derive(Debug, sqlx::FromRow)]
struct VersionSummaryRow {
    version: String,
    created_at: i64,
    member_count: i64,
}

/// All versions, newest first, with their member counts.
pub async fn list_versions(pool: &SqlitePool) -> Result<Vec<VersionSummary>, CatalogError> {
    let rows = sqlx::query_as::<_, VersionSummaryRow>(
        "SELECT v.version, v.created_at, COUNT(m.artifact_id) AS member_count
         FROM versions v
         LEFT JOIN version_members m ON m.version_id = v.id
         GROUP BY v.id
         ORDER BY v.created_at DESC, v.id DESC",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|r| {
            Ok(VersionSummary {
                version: parse_version(&r.version)?,
                created_at: from_micros(r.created_at)?,
                member_count: u64::try_from(r.member_count).map_err(|_| {
                    CatalogError::CorruptRow(format!("negative member count for {}", r.version))
                })?,
            })
        })
        .collect()
}
