//! Authenticated self-service endpoints.
//!
//! Flow Overview:
//! 1) Authenticate via session cookie or bearer token.
//! 2) Return or update the member's own profile.
//! 3) List the events the member RSVP'd to or attended.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{auth::require_member, events::types::EventResponse};
use crate::{
    api::{error::ApiError, state::AppState},
    roster::{
        models::{Event, User},
        validation::{max_words, require, BIO_MAX_WORDS},
    },
    store::ProfileUpdate,
};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MemberResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub major: String,
    pub year: String,
    pub member_id: String,
    pub bio: String,
    pub points: i64,
    pub is_admin: bool,
    pub email_verified: bool,
    pub rsvp_events: Vec<Uuid>,
    pub attended_events: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for MemberResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            major: user.major,
            year: user.year,
            member_id: user.member_id,
            bio: user.bio,
            points: user.points,
            is_admin: user.is_admin,
            email_verified: user.email_verified,
            rsvp_events: user.rsvp_events,
            attended_events: user.attended_events,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ProfileUpdateRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub major: Option<String>,
    pub year: Option<String>,
    pub member_id: Option<String>,
    pub bio: Option<String>,
}

impl ProfileUpdateRequest {
    fn into_update(self) -> Result<ProfileUpdate, ApiError> {
        let trim = |value: Option<String>| value.map(|v| v.trim().to_string());
        let update = ProfileUpdate {
            first_name: trim(self.first_name),
            last_name: trim(self.last_name),
            major: trim(self.major),
            year: trim(self.year),
            member_id: trim(self.member_id),
            bio: trim(self.bio),
        };
        if let Some(first_name) = &update.first_name {
            require("first_name", first_name)?;
        }
        if let Some(last_name) = &update.last_name {
            require("last_name", last_name)?;
        }
        if let Some(bio) = &update.bio {
            max_words("bio", bio, BIO_MAX_WORDS)?;
        }
        Ok(update)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MyEventsResponse {
    /// RSVP'd and not yet attended, soonest first.
    pub rsvped: Vec<EventResponse>,
    /// Attended, most recent first.
    pub attended: Vec<EventResponse>,
}

#[utoipa::path(
    get,
    path = "/v1/me",
    responses(
        (status = 200, description = "Return the authenticated member profile.", body = MemberResponse),
        (status = 401, description = "Missing or invalid session."),
    ),
    tag = "me"
)]
pub async fn get_me(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_member(&headers, &state).await?;
    Ok((StatusCode::OK, Json(MemberResponse::from(principal.user))))
}

#[utoipa::path(
    patch,
    path = "/v1/me",
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Profile updated.", body = MemberResponse),
        (status = 400, description = "Invalid update payload."),
        (status = 401, description = "Missing or invalid session."),
    ),
    tag = "me"
)]
pub async fn patch_me(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    Json(payload): Json<ProfileUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_member(&headers, &state).await?;
    let update = payload.into_update()?;
    if update.is_empty() {
        return Err(ApiError::bad_request("No updates provided."));
    }

    let user = state
        .store()
        .update_profile(principal.user_id(), update)
        .await?
        .ok_or_else(|| ApiError::not_found("Member"))?;
    Ok((StatusCode::OK, Json(MemberResponse::from(user))))
}

#[utoipa::path(
    get,
    path = "/v1/me/events",
    responses(
        (status = 200, description = "Events the member RSVP'd to or attended.", body = MyEventsResponse),
        (status = 401, description = "Missing or invalid session."),
    ),
    tag = "me"
)]
pub async fn my_events(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_member(&headers, &state).await?;
    let now = state.clock().now();
    let user = &principal.user;

    let mut rsvped = Vec::new();
    let mut attended = Vec::new();
    for event in state.store().events().await? {
        if user.attended_events.contains(&event.id) {
            attended.push(event);
        } else if user.rsvp_events.contains(&event.id) {
            rsvped.push(event);
        }
    }
    rsvped.sort_by_key(Event::starts_at);
    attended.sort_by_key(|event| std::cmp::Reverse(event.starts_at()));

    let view = |event: Event| EventResponse::for_viewer(event, &principal, now);
    Ok((
        StatusCode::OK,
        Json(MyEventsResponse {
            rsvped: rsvped.into_iter().map(view).collect(),
            attended: attended.into_iter().map(view).collect(),
        }),
    ))
}
