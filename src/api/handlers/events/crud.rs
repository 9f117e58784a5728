//! Event listing and admin management.

use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{
    load_event,
    types::{CodeResponse, CreateEventRequest, EventListQuery, EventResponse, UpdateEventRequest},
};
use crate::{
    api::{
        error::ApiError,
        handlers::auth::{require_admin, require_member},
        state::AppState,
    },
    roster::{
        code,
        models::Event,
        page::{paginate, Page},
        schedule,
        validation::validate_event,
    },
    store::NewEvent,
};

#[utoipa::path(
    get,
    path = "/v1/events",
    params(EventListQuery),
    responses(
        (status = 200, description = "One page of events.", body = Page<EventResponse>),
        (status = 401, description = "Missing or invalid session."),
    ),
    tag = "events"
)]
pub async fn list_events(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    Query(query): Query<EventListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_member(&headers, &state).await?;
    let now = state.clock().now();
    let events = state.store().events().await?;
    let selected = schedule::select(
        events,
        query.scope.unwrap_or_default(),
        query.q.as_deref(),
        now,
    );
    let page = paginate(selected, query.page_request())
        .map(|event: Event| EventResponse::for_viewer(event, &principal, now));
    Ok((StatusCode::OK, Json(page)))
}

#[utoipa::path(
    post,
    path = "/v1/events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created.", body = EventResponse),
        (status = 400, description = "Invalid event."),
        (status = 401, description = "Missing or invalid session."),
        (status = 403, description = "Admin access required."),
    ),
    tag = "events"
)]
pub async fn create_event(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    Json(request): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_admin(&headers, &state).await?;
    let (fields, attendance_code) = request.into_parts()?;
    validate_event(&fields)?;

    let event = state
        .store()
        .create_event(NewEvent {
            fields,
            attendance_code,
            created_by: principal.user_id(),
        })
        .await?;
    info!(event_id = %event.id, created_by = %principal.user_id(), "event created");
    let now = state.clock().now();
    Ok((
        StatusCode::CREATED,
        Json(EventResponse::for_viewer(event, &principal, now)),
    ))
}

#[utoipa::path(
    get,
    path = "/v1/events/{id}",
    params(("id" = Uuid, Path, description = "Event id")),
    responses(
        (status = 200, description = "Event details.", body = EventResponse),
        (status = 401, description = "Missing or invalid session."),
        (status = 404, description = "Event not found."),
    ),
    tag = "events"
)]
pub async fn get_event(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_member(&headers, &state).await?;
    let event = load_event(&state, id).await?;
    let now = state.clock().now();
    Ok((
        StatusCode::OK,
        Json(EventResponse::for_viewer(event, &principal, now)),
    ))
}

#[utoipa::path(
    patch,
    path = "/v1/events/{id}",
    params(("id" = Uuid, Path, description = "Event id")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Event updated.", body = EventResponse),
        (status = 400, description = "Invalid event."),
        (status = 403, description = "Admin access required."),
        (status = 404, description = "Event not found."),
    ),
    tag = "events"
)]
pub async fn update_event(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_admin(&headers, &state).await?;
    let current = load_event(&state, id).await?;
    let fields = request.apply(current.fields);
    validate_event(&fields)?;

    let event = state
        .store()
        .update_event(id, fields)
        .await?
        .ok_or_else(|| ApiError::not_found("Event"))?;
    info!(event_id = %id, "event updated");
    let now = state.clock().now();
    Ok((
        StatusCode::OK,
        Json(EventResponse::for_viewer(event, &principal, now)),
    ))
}

#[utoipa::path(
    delete,
    path = "/v1/events/{id}",
    params(("id" = Uuid, Path, description = "Event id")),
    responses(
        (status = 204, description = "Event and its registrations deleted."),
        (status = 403, description = "Only the creator may delete the event."),
        (status = 404, description = "Event not found."),
    ),
    tag = "events"
)]
pub async fn delete_event(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_member(&headers, &state).await?;
    let event = load_event(&state, id).await?;
    if event.created_by != principal.user_id() {
        return Err(ApiError::Forbidden(
            "Only the event's creator can delete it.".to_string(),
        ));
    }

    if !state.store().delete_event(id).await? {
        return Err(ApiError::not_found("Event"));
    }
    info!(event_id = %id, "event deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/v1/events/{id}/code",
    params(("id" = Uuid, Path, description = "Event id")),
    responses(
        (status = 200, description = "New attendance code.", body = CodeResponse),
        (status = 403, description = "Admin access required."),
        (status = 404, description = "Event not found."),
    ),
    tag = "events"
)]
pub async fn regenerate_code(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&headers, &state).await?;
    let attendance_code = code::generate();
    let event = state
        .store()
        .set_event_code(id, &attendance_code)
        .await?
        .ok_or_else(|| ApiError::not_found("Event"))?;
    info!(event_id = %event.id, "attendance code regenerated");
    Ok((
        StatusCode::OK,
        Json(CodeResponse {
            attendance_code: event.attendance_code,
        }),
    ))
}
