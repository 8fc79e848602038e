//! # SQLite Connection Pool
//!
//! Opens the catalog database, creating it on first use, and applies the
//! embedded migrations. WAL journaling lets readers proceed while a freeze
//! holds the write lock; the busy timeout makes concurrent writers queue
//! instead of failing immediately with `SQLITE_BUSY`.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::error::CatalogError;

/// Open (or create) the catalog at `db_path` and run migrations.
pub async fn init_pool(db_path: &Path) -> Result<SqlitePool, CatalogError> {
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(arca_store::StoreError::from)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await?;

    tracing::info!(path = %db_path.display(), "opened catalog database");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::debug!("catalog migrations applied");

    Ok(pool)
}

/// Current time as stored in the catalog.
pub(crate) fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

pub(crate) fn from_micros(micros: i64) -> Result<DateTime<Utc>, CatalogError> {
    DateTime::<Utc>::from_timestamp_micros(micros)
        .ok_or_else(|| CatalogError::CorruptRow(format!("timestamp out of range: {micros}")))
}
