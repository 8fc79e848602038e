//! # Freeze
//!
//! `POST /api/v1/freeze/:version` (and `GET`, kept for clients that trigger
//! freezes from a browser) records the newest upload of every package name
//! as the membership of `:version`. Freezing an existing version replaces
//! its membership.

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use arca_core::{Artifact, VersionName};

use crate::error::AppError;
use crate::routes::timestamp;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/v1/freeze/:version",
        post(freeze_version).get(freeze_version),
    )
}

/// One member of a frozen version.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MemberView {
    pub name: String,
    pub hash: String,
    pub uploaded_at: String,
}

impl From<&Artifact> for MemberView {
    fn from(a: &Artifact) -> Self {
        Self {
            name: a.name.to_string(),
            hash: a.content_hash.to_hex(),
            uploaded_at: timestamp(&a.uploaded_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FreezeResponse {
    pub version: String,
    pub member_count: usize,
    /// `false` when an existing version was re-frozen.
    pub created: bool,
    pub members: Vec<MemberView>,
}

/// POST /api/v1/freeze/:version: Freeze the current catalog as a version.
#[utoipa::path(
    post,
    path = "/api/v1/freeze/{version}",
    params(("version" = String, Path, description = "Version name; `latest` is reserved")),
    responses(
        (status = 200, description = "Version frozen", body = FreezeResponse),
        (status = 409, description = "Membership invariant violated", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid version name", body = crate::error::ErrorBody),
    ),
    tag = "versions"
)]
async fn freeze_version(
    State(state): State<AppState>,
    Path(version): Path<String>,
) -> Result<Json<FreezeResponse>, AppError> {
    let version = VersionName::new(version)?;
    let report = state.repository.freeze(&version).await?;
    state.metrics.record_freeze();

    Ok(Json(FreezeResponse {
        version: report.version.to_string(),
        member_count: report.member_count,
        created: report.created,
        members: report.members.iter().map(MemberView::from).collect(),
    }))
}
