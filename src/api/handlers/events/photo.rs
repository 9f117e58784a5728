//! Event photo upload.
//!
//! The image is forwarded to the configured image host and the returned URL
//! is stored on the event.

use axum::{
    extract::{Extension, Multipart, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{load_event, types::PhotoResponse};
use crate::{
    api::{error::ApiError, handlers::auth::require_admin, state::AppState},
    integrations::images::Upload,
};

/// Request body limit for the upload route.
pub const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

const FILE_FIELD: &str = "file";

async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request(err.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("photo").to_string();
        let content_type = field.content_type().map(ToString::to_string);
        if !content_type
            .as_deref()
            .is_some_and(|value| value.starts_with("image/"))
        {
            return Err(ApiError::bad_request("The uploaded file must be an image."));
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::bad_request(err.body_text()))?;
        if bytes.is_empty() {
            return Err(ApiError::bad_request("The uploaded file is empty."));
        }
        return Ok(Upload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    Err(ApiError::bad_request("Missing `file` field."))
}

#[utoipa::path(
    post,
    path = "/v1/events/{id}/photo",
    params(("id" = Uuid, Path, description = "Event id")),
    request_body(content = String, content_type = "multipart/form-data", description = "Image in the `file` field"),
    responses(
        (status = 200, description = "Photo stored.", body = PhotoResponse),
        (status = 400, description = "Missing or invalid image."),
        (status = 403, description = "Admin access required."),
        (status = 404, description = "Event not found."),
        (status = 502, description = "Image host rejected the upload."),
        (status = 503, description = "No image host configured."),
    ),
    tag = "events"
)]
pub async fn upload_photo(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&headers, &state).await?;
    load_event(&state, id).await?;
    let upload = read_upload(multipart).await?;

    let url = state.images().upload(upload).await?;
    let event = state
        .store()
        .set_event_photo(id, &url)
        .await?
        .ok_or_else(|| ApiError::not_found("Event"))?;
    info!(event_id = %id, "event photo updated");
    Ok((
        StatusCode::OK,
        Json(PhotoResponse {
            photo_url: event.photo_url.unwrap_or(url),
        }),
    ))
}
