//! # arca-api: HTTP Surface for the Arca Package Repository
//!
//! Axum server over [`arca_catalog::Repository`]:
//!
//! - `POST /api/v1/push`: upload a package file.
//! - `POST|GET /api/v1/freeze/:version`: snapshot the newest upload of
//!   every package name.
//! - `GET /api/v1/pull[/:version[/:name]]`: bundles and single files.
//! - `GET /api/v1/versions`, `/api/v1/apps`, `/api/v1/apps/all`,
//!   `/api/v1/apps/:name`: listings.
//! - `GET /health/liveness`, `/health/readiness`, `/metrics`,
//!   `/openapi.json`: operational endpoints.
//!
//! There is no authentication layer; the repository is expected to run on a
//! trusted network.

pub mod config;
pub mod error;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;

use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let metrics_on = state.config.metrics_enabled;
    let metrics = state.metrics.clone();

    let mut api = Router::new()
        .route("/", get(banner))
        .route("/api/v1/status", get(status))
        .merge(routes::push::router())
        .merge(routes::freeze::router())
        .merge(routes::pull::router())
        .merge(routes::listing::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes));

    if metrics_on {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(metrics.clone()));
    }

    let api = api
        .layer(middleware::tracing_layer::layer())
        .with_state(state.clone());

    let mut operational = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    if metrics_on {
        operational = operational
            .route("/metrics", get(prometheus_metrics))
            .layer(Extension(metrics));
    }

    let operational = operational.with_state(state);

    Router::new().merge(operational).merge(api)
}

async fn banner() -> &'static str {
    "Arca is UP"
}

async fn status() -> Json<serde_json::Value> {
    Json(json!({ "status": "OK" }))
}

/// Prometheus scrape endpoint. Catalog gauges are refreshed from the
/// database on every scrape.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    match state.repository.stats().await {
        Ok(stats) => metrics.set_catalog_counts(stats.artifacts, stats.package_names, stats.versions),
        Err(e) => tracing::warn!(error = %e, "failed to refresh catalog gauges"),
    }

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 200 "ready" once the catalog database answers,
/// 503 otherwise.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Err(e) = state.repository.ping().await {
        tracing::warn!(error = %e, "readiness check failed: catalog unreachable");
        return (StatusCode::SERVICE_UNAVAILABLE, "catalog unreachable").into_response();
    }
    if !state.repository.store().base_dir().is_dir() {
        return (StatusCode::SERVICE_UNAVAILABLE, "content store missing").into_response();
    }
    (StatusCode::OK, "ready").into_response()
}
