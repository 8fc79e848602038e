//! # Freeze Engine
//!
//! Snapshot the newest artifact of every package name into a named version.
//!
//! The four steps (ensure row, clear members, select latest, insert members)
//! run in one SQLite transaction. The first statement is a write, so the
//! transaction holds the database write lock from the start and readers in
//! WAL mode see either the old membership or the new one.
//!
//! Freezes of the same version name are additionally queued behind a
//! per-name async lock so they do not spin on `SQLITE_BUSY`; freezes of
//! different names only contend on the database itself. A lock entry lives
//! only while some freeze of that name is running or queued.

use std::sync::Arc;

use arca_core::{Artifact, VersionName};
use dashmap::DashMap;
use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use tokio::sync::Mutex;

use crate::catalog::all_latest_artifacts;
use crate::error::CatalogError;
use crate::registry::{add_membership, clear_membership, ensure_version};

/// Outcome of one freeze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FreezeReport {
    pub version: VersionName,
    pub member_count: usize,
    /// Captured artifacts, ordered by name.
    pub members: Vec<Artifact>,
    /// `false` when an existing version's membership was replaced.
    pub created: bool,
}

/// Serializes freezes per version name.
#[derive(Debug, Default)]
pub struct FreezeEngine {
    locks: DashMap<VersionName, Arc<Mutex<()>>>,
}

impl FreezeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Freeze the current latest-per-name set as `version`.
    ///
    /// Re-running with the same name replaces the membership. An empty
    /// catalog produces a version with no members.
    pub async fn freeze(
        &self,
        pool: &SqlitePool,
        version: &VersionName,
    ) -> Result<FreezeReport, CatalogError> {
        let lock = {
            let entry = self
                .locks
                .entry(version.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())));
            Arc::clone(entry.value())
        };
        let result = {
            let _guard = lock.lock().await;
            Self::freeze_locked(pool, version).await
        };
        // Map copy plus ours: nobody else is waiting on this name.
        self.locks.remove_if(version, |_, l| Arc::strong_count(l) == 2);
        result
    }

    async fn freeze_locked(
        pool: &SqlitePool,
        version: &VersionName,
    ) -> Result<FreezeReport, CatalogError> {
        let mut tx = pool.begin().await?;

        let created = ensure_version(&mut *tx, version).await?;
        let cleared = clear_membership(&mut *tx, version).await?;
        let members = all_latest_artifacts(&mut *tx).await?;
        for artifact in &members {
            add_membership(&mut *tx, version, artifact).await?;
        }

        tx.commit().await?;

        tracing::info!(
            version = %version,
            members = members.len(),
            replaced = cleared,
            created,
            "froze version"
        );

        Ok(FreezeReport {
            version: version.clone(),
            member_count: members.len(),
            members,
            created,
        })
    }
}
