//! # Listings
//!
//! Read-only views of the catalog and version registry.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use arca_core::{HistoryEntry, NameHistory, NameSummary, PackageName, VersionSummary};

use crate::error::AppError;
use crate::routes::timestamp;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    // `/apps/all` is a static segment and wins over `/apps/:name`.
    Router::new()
        .route("/api/v1/versions", get(list_versions))
        .route("/api/v1/apps", get(list_apps))
        .route("/api/v1/apps/all", get(list_app_history))
        .route("/api/v1/apps/:name", get(get_app_history))
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VersionView {
    pub version: String,
    pub created_at: String,
    pub member_count: u64,
}

impl From<VersionSummary> for VersionView {
    fn from(v: VersionSummary) -> Self {
        Self {
            version: v.version.to_string(),
            created_at: timestamp(&v.created_at),
            member_count: v.member_count,
        }
    }
}

/// Frozen versions, newest first.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VersionList {
    pub versions: Vec<VersionView>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AppView {
    pub name: String,
    pub latest_hash: String,
    pub latest_uploaded_at: String,
    /// Newest frozen version containing the latest upload, if any.
    pub version_tag: Option<String>,
}

impl From<NameSummary> for AppView {
    fn from(s: NameSummary) -> Self {
        Self {
            name: s.name.to_string(),
            latest_hash: s.latest_hash.to_hex(),
            latest_uploaded_at: timestamp(&s.latest_uploaded_at),
            version_tag: s.version_tag.map(|v| v.to_string()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AppList {
    pub apps: Vec<AppView>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadView {
    pub hash: String,
    pub uploaded_at: String,
    pub annotation: String,
    pub version_tags: Vec<String>,
}

impl From<HistoryEntry> for UploadView {
    fn from(e: HistoryEntry) -> Self {
        Self {
            hash: e.content_hash.to_hex(),
            uploaded_at: timestamp(&e.uploaded_at),
            annotation: e.annotation,
            version_tags: e.version_tags.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Upload history of one package name, newest first.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AppHistory {
    pub name: String,
    pub versions: Vec<UploadView>,
}

impl From<NameHistory> for AppHistory {
    fn from(h: NameHistory) -> Self {
        Self {
            name: h.name.to_string(),
            versions: h.versions.into_iter().map(UploadView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AppHistoryList {
    pub apps: Vec<AppHistory>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/versions: List frozen versions.
#[utoipa::path(
    get,
    path = "/api/v1/versions",
    responses((status = 200, description = "Frozen versions, newest first", body = VersionList)),
    tag = "versions"
)]
async fn list_versions(State(state): State<AppState>) -> Result<Json<VersionList>, AppError> {
    let versions = state.repository.versions().await?;
    Ok(Json(VersionList {
        versions: versions.into_iter().map(VersionView::from).collect(),
    }))
}

/// GET /api/v1/apps: List package names with their newest upload.
#[utoipa::path(
    get,
    path = "/api/v1/apps",
    responses((status = 200, description = "Package names", body = AppList)),
    tag = "packages"
)]
async fn list_apps(State(state): State<AppState>) -> Result<Json<AppList>, AppError> {
    let names = state.repository.names().await?;
    Ok(Json(AppList {
        apps: names.into_iter().map(AppView::from).collect(),
    }))
}

/// GET /api/v1/apps/all: Full upload history of every package name.
#[utoipa::path(
    get,
    path = "/api/v1/apps/all",
    responses((status = 200, description = "Upload history per name", body = AppHistoryList)),
    tag = "packages"
)]
async fn list_app_history(
    State(state): State<AppState>,
) -> Result<Json<AppHistoryList>, AppError> {
    let history = state.repository.history().await?;
    Ok(Json(AppHistoryList {
        apps: history.into_iter().map(AppHistory::from).collect(),
    }))
}

/// GET /api/v1/apps/:name: Upload history of one package name.
#[utoipa::path(
    get,
    path = "/api/v1/apps/{name}",
    params(("name" = String, Path, description = "Package name")),
    responses(
        (status = 200, description = "Upload history", body = AppHistory),
        (status = 404, description = "Name never pushed", body = crate::error::ErrorBody),
    ),
    tag = "packages"
)]
async fn get_app_history(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<AppHistory>, AppError> {
    let name = PackageName::new(name)?;
    let history = state.repository.name_history(&name).await?;
    Ok(Json(AppHistory::from(history)))
}
