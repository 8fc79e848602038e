//! # Push
//!
//! `POST /api/v1/push` accepts a `multipart/form-data` body:
//!
//! - `file` (required): the package, sent with its filename. The filename
//!   stem becomes the package name.
//! - `message` (optional): free-text annotation.
//!
//! New content answers `201 Created`; content already in the catalog
//! answers `200 OK` with `status: "duplicate"`.

use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use arca_catalog::PushStatus;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/v1/push", post(push_package))
}

/// Result of a push.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PushResponse {
    /// `created` or `duplicate`.
    pub status: String,
    pub name: String,
    /// SHA-256 of the uploaded bytes, lowercase hex.
    pub hash: String,
    /// Storage location; present only when the push created the artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Form fields accepted by the push endpoint (documentation only).
#[derive(Debug, ToSchema)]
pub struct PushForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    pub message: Option<String>,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::BadRequest(e.body_text())
    }
}

/// POST /api/v1/push: Upload a package.
#[utoipa::path(
    post,
    path = "/api/v1/push",
    request_body(content = PushForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Artifact stored and catalogued", body = PushResponse),
        (status = 200, description = "Identical content already catalogued", body = PushResponse),
        (status = 413, description = "Upload exceeds size limit", body = crate::error::ErrorBody),
        (status = 422, description = "Missing file, wrong extension, or invalid name", body = crate::error::ErrorBody),
    ),
    tag = "packages"
)]
async fn push_package(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<PushResponse>), AppError> {
    let result = receive(&state, multipart).await;
    if result.is_err() {
        state.metrics.record_push("rejected");
    }
    result
}

async fn receive(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<PushResponse>), AppError> {
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut message = String::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::Validation("`file` part has no filename".to_string()))?;
                let bytes = field.bytes().await.map_err(multipart_error)?;
                upload = Some((filename, bytes.to_vec()));
            }
            Some("message") => {
                message = field.text().await.map_err(multipart_error)?;
            }
            _ => {}
        }
    }

    let (filename, bytes) =
        upload.ok_or_else(|| AppError::Validation("missing multipart field `file`".to_string()))?;

    let outcome = state.repository.push(&filename, bytes, &message).await?;

    let (status, label) = match outcome.status {
        PushStatus::Created => (StatusCode::CREATED, "created"),
        PushStatus::Duplicate => (StatusCode::OK, "duplicate"),
    };
    state.metrics.record_push(label);

    let path = match outcome.status {
        PushStatus::Created => Some(outcome.path.display().to_string()),
        PushStatus::Duplicate => None,
    };

    Ok((
        status,
        Json(PushResponse {
            status: label.to_string(),
            name: outcome.name.to_string(),
            hash: outcome.hash.to_hex(),
            path,
        }),
    ))
}
