//! # Artifact Catalog
//!
//! Relational record of every pushed artifact. One row per content hash;
//! rows are never updated or deleted.
//!
//! ## Latest per name
//!
//! "Latest" means maximum `(uploaded_at, id)`. `uploaded_at` is assigned
//! here, clamped so it never goes below the newest existing row, and `id` is
//! AUTOINCREMENT, so the pair is a strict total order over inserts even when
//! the wall clock steps backwards or two pushes land in the same microsecond.
//!
//! Functions that may run inside the freeze transaction accept any
//! [`SqliteExecutor`]; the rest take the pool directly.

use std::collections::HashMap;

use arca_core::{Artifact, ContentDigest, HistoryEntry, NameHistory, NameSummary, PackageName, VersionName};
use sqlx::sqlite::{SqliteExecutor, SqlitePool};

use crate::db::{from_micros, now_micros};
use crate::error::CatalogError;
use crate::rows::{into_artifacts, parse_hash, parse_name, parse_version, ArtifactRow};

/// Record an artifact. Returns `false` when `content_hash` is already
/// catalogued, in which case nothing changes.
pub async fn insert_artifact(
    executor: impl SqliteExecutor<'_>,
    name: &PackageName,
    content_hash: &ContentDigest,
    annotation: &str,
) -> Result<bool, CatalogError> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO artifacts (name, content_hash, annotation, uploaded_at)
         VALUES (?1, ?2, ?3, MAX(?4, (SELECT COALESCE(MAX(uploaded_at), 0) FROM artifacts)))",
    )
    .bind(name.as_str())
    .bind(content_hash.to_hex())
    .bind(annotation)
    .bind(now_micros())
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Newest push of `name`.
pub async fn latest_artifact_for(
    executor: impl SqliteExecutor<'_>,
    name: &PackageName,
) -> Result<Option<Artifact>, CatalogError> {
    let row = sqlx::query_as::<_, ArtifactRow>(
        "SELECT id, name, content_hash, annotation, uploaded_at
         FROM artifacts WHERE name = ?1
         ORDER BY uploaded_at DESC, id DESC LIMIT 1",
    )
    .bind(name.as_str())
    .fetch_optional(executor)
    .await?;

    row.map(ArtifactRow::into_artifact).transpose()
}

pub async fn artifact_by_hash(
    executor: impl SqliteExecutor<'_>,
    content_hash: &ContentDigest,
) -> Result<Option<Artifact>, CatalogError> {
    let row = sqlx::query_as::<_, ArtifactRow>(
        "SELECT id, name, content_hash, annotation, uploaded_at
         FROM artifacts WHERE content_hash = ?1",
    )
    .bind(content_hash.to_hex())
    .fetch_optional(executor)
    .await?;

    row.map(ArtifactRow::into_artifact).transpose()
}

/// One artifact per distinct name, each the newest push of that name,
/// ordered by name. This is exactly the membership a freeze captures.
pub async fn all_latest_artifacts(
    executor: impl SqliteExecutor<'_>,
) -> Result<Vec<Artifact>, CatalogError> {
    let rows = sqlx::query_as::<_, ArtifactRow>(
        "SELECT id, name, content_hash, annotation, uploaded_at FROM (
             SELECT id, name, content_hash, annotation, uploaded_at,
                    ROW_NUMBER() OVER (
                        PARTITION BY name ORDER BY uploaded_at DESC, id DESC
                    ) AS rn
             FROM artifacts
         )
         WHERE rn = 1
         ORDER BY name",
    )
    .fetch_all(executor)
    .await?;

    into_artifacts(rows)
}

#[derive(Debug, sqlx::FromRow)]
struct NameSummaryRow {
    name: String,
    content_hash: String,
    uploaded_at: i64,
    version_tag: Option<String>,
}

/// Every package name with its newest push and the newest frozen version
/// that contains that push, if any.
pub async fn list_distinct_names(pool: &SqlitePool) -> Result<Vec<NameSummary>, CatalogError> {
    let rows = sqlx::query_as::<_, NameSummaryRow>(
        "WITH latest AS (
             SELECT id, name, content_hash, uploaded_at,
                    ROW_NUMBER() OVER (
                        PARTITION BY name ORDER BY uploaded_at DESC, id DESC
                    ) AS rn
             FROM artifacts
         )
         SELECT l.name, l.content_hash, l.uploaded_at,
                (SELECT v.version
                 FROM version_members m JOIN versions v ON v.id = m.version_id
                 WHERE m.artifact_id = l.id
                 ORDER BY v.created_at DESC, v.id DESC
                 LIMIT 1) AS version_tag
         FROM latest l
         WHERE l.rn = 1
         ORDER BY l.name",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|r| {
            Ok(NameSummary {
                name: parse_name(&r.name)?,
                latest_hash: parse_hash(&r.content_hash)?,
                latest_uploaded_at: from_micros(r.uploaded_at)?,
                version_tag: r.version_tag.as_deref().map(parse_version).transpose()?,
            })
        })
        .collect()
}

/// Every push of `name`, newest first.
pub async fn list_all_versions_of_name(
    pool: &SqlitePool,
    name: &PackageName,
) -> Result<Vec<Artifact>, CatalogError> {
    let rows = sqlx::query_as::<_, ArtifactRow>(
        "SELECT id, name, content_hash, annotation, uploaded_at
         FROM artifacts WHERE name = ?1
         ORDER BY uploaded_at DESC, id DESC",
    )
    .bind(name.as_str())
    .fetch_all(pool)
    .await?;

    into_artifacts(rows)
}

/// Every artifact in insertion order.
pub async fn all_artifacts(pool: &SqlitePool) -> Result<Vec<Artifact>, CatalogError> {
    let rows = sqlx::query_as::<_, ArtifactRow>(
        "SELECT id, name, content_hash, annotation, uploaded_at FROM artifacts ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    into_artifacts(rows)
}

// ---------------------------------------------------------------------------
// Upload history
// ---------------------------------------------------------------------------

#[derive(Debug, sqlx::FromRow)]
struct TagRow {
    artifact_id: i64,
    version: String,
}

/// Full upload history of every name, names ascending, uploads newest first.
/// Each entry lists the frozen versions that include it, newest first.
pub async fn artifact_history(pool: &SqlitePool) -> Result<Vec<NameHistory>, CatalogError> {
    let rows = sqlx::query_as::<_, ArtifactRow>(
        "SELECT id, name, content_hash, annotation, uploaded_at
         FROM artifacts ORDER BY name, uploaded_at DESC, id DESC",
    )
    .fetch_all(pool)
    .await?;

    build_history(pool, rows).await
}

/// Upload history of a single name, or `None` if it was never pushed.
pub async fn name_history(
    pool: &SqlitePool,
    name: &PackageName,
) -> Result<Option<NameHistory>, CatalogError> {
    let rows = sqlx::query_as::<_, ArtifactRow>(
        "SELECT id, name, content_hash, annotation, uploaded_at
         FROM artifacts WHERE name = ?1 ORDER BY uploaded_at DESC, id DESC",
    )
    .bind(name.as_str())
    .fetch_all(pool)
    .await?;

    Ok(build_history(pool, rows).await?.into_iter().next())
}

async fn build_history(
    pool: &SqlitePool,
    rows: Vec<ArtifactRow>,
) -> Result<Vec<NameHistory>, CatalogError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let tag_rows = sqlx::query_as::<_, TagRow>(
        "SELECT m.artifact_id, v.version
         FROM version_members m JOIN versions v ON v.id = m.version_id
         ORDER BY v.created_at DESC, v.id DESC",
    )
    .fetch_all(pool)
    .await?;

    let mut tags: HashMap<i64, Vec<VersionName>> = HashMap::new();
    for t in tag_rows {
        tags.entry(t.artifact_id)
            .or_default()
            .push(parse_version(&t.version)?);
    }

    // Rows arrive grouped by name, so a name change starts a new history.
    let mut histories: Vec<NameHistory> = Vec::new();
    for row in rows {
        let version_tags = tags.remove(&row.id).unwrap_or_default();
        let artifact = row.into_artifact()?;
        let entry = HistoryEntry {
            content_hash: artifact.content_hash,
            uploaded_at: artifact.uploaded_at,
            annotation: artifact.annotation,
            version_tags,
        };
        match histories.last_mut() {
            Some(h) if h.name == artifact.name => h.versions.push(entry),
            _ => histories.push(NameHistory {
                name: artifact.name,
                versions: vec![entry],
            }),
        }
    }

    Ok(histories)
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Row counts used by the metrics gauges and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CatalogStats {
    pub artifacts: i64,
    pub package_names: i64,
    pub versions: i64,
}

pub async fn stats(pool: &SqlitePool) -> Result<CatalogStats, CatalogError> {
    let (artifacts, package_names, versions): (i64, i64, i64) = sqlx::query_as(
        "SELECT (SELECT COUNT(*) FROM artifacts),
                (SELECT COUNT(DISTINCT name) FROM artifacts),
                (SELECT COUNT(*) FROM versions)",
    )
    .fetch_one(pool)
    .await?;

    Ok(CatalogStats {
        artifacts,
        package_names,
        versions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_pool;
    use arca_core::sha256_digest;

    async fn pool() -> (tempfile::TempDir, SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_pool(&dir.path().join("catalog.db")).await.unwrap();
        (dir, pool)
    }

    fn name(s: &str) -> PackageName {
        PackageName::new(s).unwrap()
    }

    #[tokio::test]
    async fn insert_is_insert_or_ignore() {
        let (_dir, pool) = pool().await;
        let h = sha256_digest(b"one");
        assert!(insert_artifact(&pool, &name("app"), &h, "first").await.unwrap());
        assert!(!insert_artifact(&pool, &name("app"), &h, "second").await.unwrap());

        let stored = artifact_by_hash(&pool, &h).await.unwrap().unwrap();
        assert_eq!(stored.annotation, "first");
        assert_eq!(stats(&pool).await.unwrap().artifacts, 1);
    }

    #[tokio::test]
    async fn same_hash_under_another_name_is_still_a_duplicate() {
        let (_dir, pool) = pool().await;
        let h = sha256_digest(b"shared");
        assert!(insert_artifact(&pool, &name("app"), &h, "").await.unwrap());
        assert!(!insert_artifact(&pool, &name("other"), &h, "").await.unwrap());
        assert!(latest_artifact_for(&pool, &name("other")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn latest_is_newest_insert() {
        let (_dir, pool) = pool().await;
        let h1 = sha256_digest(b"v1");
        let h2 = sha256_digest(b"v2");
        insert_artifact(&pool, &name("app"), &h1, "").await.unwrap();
        insert_artifact(&pool, &name("app"), &h2, "").await.unwrap();

        let latest = latest_artifact_for(&pool, &name("app")).await.unwrap().unwrap();
        assert_eq!(latest.content_hash, h2);
    }

    #[tokio::test]
    async fn uploaded_at_never_decreases() {
        let (_dir, pool) = pool().await;
        // Seed a row far in the future; later inserts must not sort before it.
        sqlx::query(
            "INSERT INTO artifacts (name, content_hash, annotation, uploaded_at) VALUES ('app', ?1, '', ?2)",
        )
        .bind(sha256_digest(b"future").to_hex())
        .bind(now_micros() + 3_600_000_000)
        .execute(&pool)
        .await
        .unwrap();

        let h = sha256_digest(b"now");
        insert_artifact(&pool, &name("app"), &h, "").await.unwrap();
        let latest = latest_artifact_for(&pool, &name("app")).await.unwrap().unwrap();
        assert_eq!(latest.content_hash, h);
    }

    #[tokio::test]
    async fn all_latest_has_one_row_per_name_sorted() {
        let (_dir, pool) = pool().await;
        insert_artifact(&pool, &name("zeta"), &sha256_digest(b"z1"), "").await.unwrap();
        insert_artifact(&pool, &name("alpha"), &sha256_digest(b"a1"), "").await.unwrap();
        insert_artifact(&pool, &name("zeta"), &sha256_digest(b"z2"), "").await.unwrap();

        let latest = all_latest_artifacts(&pool).await.unwrap();
        let pairs: Vec<(&str, ContentDigest)> =
            latest.iter().map(|a| (a.name.as_str(), a.content_hash)).collect();
        assert_eq!(
            pairs,
            vec![("alpha", sha256_digest(b"a1")), ("zeta", sha256_digest(b"z2"))]
        );
    }

    #[tokio::test]
    async fn versions_of_name_newest_first() {
        let (_dir, pool) = pool().await;
        for payload in [b"1", b"2", b"3"] {
            insert_artifact(&pool, &name("app"), &sha256_digest(payload), "").await.unwrap();
        }
        let all = list_all_versions_of_name(&pool, &name("app")).await.unwrap();
        let hashes: Vec<_> = all.iter().map(|a| a.content_hash).collect();
        assert_eq!(
            hashes,
            vec![sha256_digest(b"3"), sha256_digest(b"2"), sha256_digest(b"1")]
        );
        assert!(all.windows(2).all(|w| w[0].uploaded_at >= w[1].uploaded_at));
    }

    #[tokio::test]
    async fn distinct_names_without_versions_have_no_tag() {
        let (_dir, pool) = pool().await;
        insert_artifact(&pool, &name("app"), &sha256_digest(b"a"), "").await.unwrap();
        let names = list_distinct_names(&pool).await.unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0].latest_hash, sha256_digest(b"a"));
        assert!(names[0].version_tag.is_none());
    }

    #[tokio::test]
    async fn history_groups_by_name() {
        let (_dir, pool) = pool().await;
        insert_artifact(&pool, &name("lib"), &sha256_digest(b"l1"), "lib one").await.unwrap();
        insert_artifact(&pool, &name("app"), &sha256_digest(b"a1"), "app one").await.unwrap();
        insert_artifact(&pool, &name("app"), &sha256_digest(b"a2"), "app two").await.unwrap();

        let history = artifact_history(&pool).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].name.as_str(), "app");
        assert_eq!(history[0].versions.len(), 2);
        assert_eq!(history[0].versions[0].annotation, "app two");
        assert_eq!(history[1].name.as_str(), "lib");

        let app = name_history(&pool, &name("app")).await.unwrap().unwrap();
        assert_eq!(app, history[0]);
        assert!(name_history(&pool, &name("ghost")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stats_counts_rows() {
        let (_dir, pool) = pool().await;
        assert_eq!(stats(&pool).await.unwrap(), CatalogStats::default());
        insert_artifact(&pool, &name("app"), &sha256_digest(b"1"), "").await.unwrap();
        insert_artifact(&pool, &name("app"), &sha256_digest(b"2"), "").await.unwrap();
        insert_artifact(&pool, &name("lib"), &sha256_digest(b"3"), "").await.unwrap();
        let s = stats(&pool).await.unwrap();
        assert_eq!(s.artifacts, 3);
        assert_eq!(s.package_names, 2);
        assert_eq!(s.versions, 0);
    }
}
