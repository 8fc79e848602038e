//! # Pull
//!
//! - `GET /api/v1/pull`: bundle of the newest frozen version.
//! - `GET /api/v1/pull/:version`: bundle of a version (`latest` allowed).
//! - `GET /api/v1/pull/:version/:name`: one package file. With `latest`
//!   this reads the live catalog, so it works before any freeze.
//!
//! Bundles are gzip-compressed tar archives whose entries are named
//! `{name}.{extension}`.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use arca_core::{PackageName, VersionSelector};

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/pull", get(pull_latest_bundle))
        .route("/api/v1/pull/:version", get(pull_bundle))
        .route("/api/v1/pull/:version/:name", get(pull_single))
}

fn attachment(filename: &str) -> String {
    format!("attachment; filename=\"{filename}\"")
}

async fn bundle_response(state: &AppState, selector: VersionSelector) -> Result<Response, AppError> {
    let (version, bytes) = state.repository.bundle(&selector).await?;
    tracing::info!(version = %version, bytes = bytes.len(), "serving bundle");
    Ok((
        [
            (header::CONTENT_TYPE, "application/gzip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                attachment(&format!("{version}.tar.gz")),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// GET /api/v1/pull: Bundle of the newest frozen version.
#[utoipa::path(
    get,
    path = "/api/v1/pull",
    responses(
        (status = 200, description = "gzip tar bundle", content_type = "application/gzip", body = Vec<u8>),
        (status = 404, description = "No version has been frozen", body = crate::error::ErrorBody),
    ),
    tag = "pull"
)]
async fn pull_latest_bundle(State(state): State<AppState>) -> Result<Response, AppError> {
    bundle_response(&state, VersionSelector::Latest).await
}

/// GET /api/v1/pull/:version: Bundle of a frozen version.
#[utoipa::path(
    get,
    path = "/api/v1/pull/{version}",
    params(("version" = String, Path, description = "Version name or `latest`")),
    responses(
        (status = 200, description = "gzip tar bundle", content_type = "application/gzip", body = Vec<u8>),
        (status = 404, description = "Unknown or empty version", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid version name", body = crate::error::ErrorBody),
    ),
    tag = "pull"
)]
async fn pull_bundle(
    State(state): State<AppState>,
    Path(version): Path<String>,
) -> Result<Response, AppError> {
    let selector = VersionSelector::parse(&version)?;
    bundle_response(&state, selector).await
}

/// GET /api/v1/pull/:version/:name: One package file.
#[utoipa::path(
    get,
    path = "/api/v1/pull/{version}/{name}",
    params(
        ("version" = String, Path, description = "Version name or `latest`"),
        ("name" = String, Path, description = "Package name"),
    ),
    responses(
        (status = 200, description = "Raw package bytes", content_type = "application/octet-stream", body = Vec<u8>),
        (status = 404, description = "Version, package, or file not found", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid version or package name", body = crate::error::ErrorBody),
    ),
    tag = "pull"
)]
async fn pull_single(
    State(state): State<AppState>,
    Path((version, name)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let selector = VersionSelector::parse(&version)?;
    let name = PackageName::new(name)?;
    let (resolved, bytes) = state.repository.fetch(&selector, &name).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                attachment(&resolved.display_filename),
            ),
            (
                header::ETAG,
                format!("\"{}\"", resolved.artifact.content_hash.to_hex()),
            ),
        ],
        bytes,
    )
        .into_response())
}
