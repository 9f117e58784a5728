//! RSVP, sign-in and cancellation for the calling member.
//!
//! Flow Overview:
//! 1) Load the event and the member's current registration.
//! 2) Plan the transition against the event window (and code, for sign-in).
//! 3) Hand the transition to the store, which applies it and the point change
//!    together and refuses it if the registration moved underneath us.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{
    auth::{require_member, Principal},
    events::{
        load_event,
        types::{RegistrationResponse, RsvpRequest, SignInRequest},
    },
};
use crate::{
    api::{error::ApiError, state::AppState},
    roster::{
        models::{Event, Registration, Responses},
        registration::{plan_cancel, plan_rsvp, plan_sign_in, RegistrationStatus, Transition},
        validation::validate_responses,
        window::Window,
    },
    store::RegistrationChange,
};

struct Context {
    principal: Principal,
    event: Event,
    registration: Option<Registration>,
}

impl Context {
    fn status(&self) -> RegistrationStatus {
        self.registration
            .as_ref()
            .map_or(RegistrationStatus::Unregistered, Registration::status)
    }
}

async fn load_context(
    headers: &HeaderMap,
    state: &AppState,
    event_id: Uuid,
) -> Result<Context, ApiError> {
    let principal = require_member(headers, state).await?;
    let event = load_event(state, event_id).await?;
    let registration = state
        .store()
        .registration(event_id, principal.user_id())
        .await?;
    Ok(Context {
        principal,
        event,
        registration,
    })
}

async fn commit(
    state: &AppState,
    context: &Context,
    transition: Transition,
    responses: Option<Responses>,
) -> Result<RegistrationResponse, ApiError> {
    let now = state.clock().now();
    let user_id = context.principal.user_id();
    let user = state
        .store()
        .apply_registration(RegistrationChange {
            event_id: context.event.id,
            user_id,
            transition,
            at: now,
            responses,
        })
        .await?;
    info!(
        event_id = %context.event.id,
        %user_id,
        action = ?transition.action,
        points = user.points,
        "registration changed"
    );
    let registration = state.store().registration(context.event.id, user_id).await?;
    Ok(RegistrationResponse::new(
        &context.event,
        registration,
        user.points,
        now,
    ))
}

#[utoipa::path(
    get,
    path = "/v1/events/{id}/registration",
    params(("id" = Uuid, Path, description = "Event id")),
    responses(
        (status = 200, description = "Window and the caller's registration.", body = RegistrationResponse),
        (status = 401, description = "Missing or invalid session."),
        (status = 404, description = "Event not found."),
    ),
    tag = "registration"
)]
pub async fn get_registration(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let context = load_context(&headers, &state, id).await?;
    let now = state.clock().now();
    let response = RegistrationResponse::new(
        &context.event,
        context.registration,
        context.principal.user.points,
        now,
    );
    Ok((StatusCode::OK, Json(response)))
}

#[utoipa::path(
    post,
    path = "/v1/events/{id}/rsvp",
    params(("id" = Uuid, Path, description = "Event id")),
    request_body = RsvpRequest,
    responses(
        (status = 200, description = "RSVP recorded.", body = RegistrationResponse),
        (status = 400, description = "Invalid answers."),
        (status = 404, description = "Event not found."),
        (status = 409, description = "RSVP closed or already registered."),
    ),
    tag = "registration"
)]
pub async fn rsvp(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<RsvpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let context = load_context(&headers, &state, id).await?;
    let now = state.clock().now();
    let transition = plan_rsvp(context.status(), Window::at(&context.event, now))?;
    let responses = validate_responses(&context.event.fields.questions, request.responses)?;

    let response = commit(&state, &context, transition, Some(responses)).await?;
    Ok((StatusCode::OK, Json(response)))
}

#[utoipa::path(
    post,
    path = "/v1/events/{id}/sign-in",
    params(("id" = Uuid, Path, description = "Event id")),
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in; points credited.", body = RegistrationResponse),
        (status = 400, description = "Malformed code or invalid answers."),
        (status = 403, description = "Wrong attendance code."),
        (status = 404, description = "Event not found."),
        (status = 409, description = "Sign-in closed or already signed in."),
    ),
    tag = "registration"
)]
pub async fn sign_in(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<SignInRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let context = load_context(&headers, &state, id).await?;
    let now = state.clock().now();
    let status = context.status();
    let transition = plan_sign_in(
        status,
        Window::at(&context.event, now),
        &context.event,
        &request.code,
    )?;

    let questions = &context.event.fields.questions;
    let responses = match request.responses {
        Some(responses) => Some(validate_responses(questions, responses)?),
        // walk-ins still owe answers to required questions
        None if status == RegistrationStatus::Unregistered => {
            Some(validate_responses(questions, Vec::new())?)
        }
        None => None,
    };

    let response = commit(&state, &context, transition, responses).await?;
    Ok((StatusCode::OK, Json(response)))
}

#[utoipa::path(
    delete,
    path = "/v1/events/{id}/registration",
    params(("id" = Uuid, Path, description = "Event id")),
    responses(
        (status = 200, description = "Registration removed; credited points taken back.", body = RegistrationResponse),
        (status = 404, description = "Event not found or not registered."),
        (status = 409, description = "Registration changed concurrently."),
    ),
    tag = "registration"
)]
pub async fn cancel(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let context = load_context(&headers, &state, id).await?;
    let transition = plan_cancel(context.status(), &context.event)?;
    let response = commit(&state, &context, transition, None).await?;
    Ok((StatusCode::OK, Json(response)))
}
