//! CSV roster download for admins.

use axum::{
    extract::{Extension, Path},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::IntoResponse,
};
use std::{collections::BTreeSet, sync::Arc};
use tracing::{error, info};
use uuid::Uuid;

use super::{auth::require_admin, events::load_event};
use crate::{
    api::{error::ApiError, state::AppState},
    roster::export,
};

#[utoipa::path(
    get,
    path = "/v1/events/{id}/roster.csv",
    params(("id" = Uuid, Path, description = "Event id")),
    responses(
        (status = 200, description = "Roster as CSV.", body = String, content_type = "text/csv"),
        (status = 403, description = "Admin access required."),
        (status = 404, description = "Event not found."),
    ),
    tag = "events"
)]
pub async fn roster_csv(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&headers, &state).await?;
    let event = load_event(&state, id).await?;

    let ids: Vec<Uuid> = event
        .rsvp_attendees
        .iter()
        .chain(event.attendees.iter())
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let users = state.store().users(&ids).await?;
    let roster = export::build(&event, &users);
    info!(
        event_id = %id,
        rows = roster.rows,
        attended = roster.summary.total_attended(),
        "roster exported"
    );

    let disposition = format!(
        "attachment; filename=\"{}\"",
        export::file_name(&event.fields.name)
    );
    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    response_headers.insert(
        CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition).map_err(|err| {
            error!("Failed to build Content-Disposition header: {err}");
            ApiError::Internal
        })?,
    );
    Ok((StatusCode::OK, response_headers, roster.csv))
}
