//! # OpenAPI Document
//!
//! Assembles every utoipa-documented route into one OpenAPI spec, served at
//! `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Arca Package Repository",
        description = "Content-addressed package repository.\n\nPush package files, freeze the newest upload of every package name into a named version, and pull whole versions as `.tar.gz` bundles or single files.",
        license(name = "BUSL-1.1")
    ),
    servers(
        (url = "http://localhost:8888", description = "Local development server"),
    ),
    paths(
        crate::routes::push::push_package,
        crate::routes::freeze::freeze_version,
        crate::routes::pull::pull_latest_bundle,
        crate::routes::pull::pull_bundle,
        crate::routes::pull::pull_single,
        crate::routes::listing::list_versions,
        crate::routes::listing::list_apps,
        crate::routes::listing::list_app_history,
        crate::routes::listing::get_app_history,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            crate::routes::push::PushForm,
            crate::routes::push::PushResponse,
            crate::routes::freeze::FreezeResponse,
            crate::routes::freeze::MemberView,
            crate::routes::listing::VersionList,
            crate::routes::listing::VersionView,
            crate::routes::listing::AppList,
            crate::routes::listing::AppView,
            crate::routes::listing::AppHistoryList,
            crate::routes::listing::AppHistory,
            crate::routes::listing::UploadView,
        )
    ),
    tags(
        (name = "packages", description = "Upload and package listings"),
        (name = "versions", description = "Freezing and listing versions"),
        (name = "pull", description = "Bundle and single-file retrieval"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(serve_openapi))
}

async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
