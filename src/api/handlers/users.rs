//! Admin member management.

use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{auth::require_admin, me::MemberResponse};
use crate::{
    api::{error::ApiError, state::AppState},
    roster::page::{paginate, Page, PageRequest},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminUpdateRequest {
    pub is_admin: bool,
}

#[utoipa::path(
    get,
    path = "/v1/users",
    params(PageRequest),
    responses(
        (status = 200, description = "Members by last name.", body = Page<MemberResponse>),
        (status = 401, description = "Missing or invalid session."),
        (status = 403, description = "Admin access required."),
    ),
    tag = "users"
)]
pub async fn list_users(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    Query(request): Query<PageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&headers, &state).await?;
    let mut users = state.store().all_users().await?;
    users.sort_by_key(|user| {
        (
            user.last_name.to_lowercase(),
            user.first_name.to_lowercase(),
            user.id,
        )
    });
    let page = paginate(users, request).map(MemberResponse::from);
    Ok((StatusCode::OK, Json(page)))
}

#[utoipa::path(
    put,
    path = "/v1/users/{id}/admin",
    params(("id" = Uuid, Path, description = "Member id")),
    request_body = AdminUpdateRequest,
    responses(
        (status = 200, description = "Admin flag updated.", body = MemberResponse),
        (status = 400, description = "Admins cannot demote themselves."),
        (status = 403, description = "Admin access required."),
        (status = 404, description = "Member not found."),
    ),
    tag = "users"
)]
pub async fn set_admin(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<AdminUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_admin(&headers, &state).await?;
    if id == principal.user_id() && !request.is_admin {
        return Err(ApiError::bad_request(
            "You cannot remove your own admin access.",
        ));
    }

    let user = state
        .store()
        .set_admin(id, request.is_admin)
        .await?
        .ok_or_else(|| ApiError::not_found("Member"))?;
    info!(user_id = %id, is_admin = request.is_admin, by = %principal.user_id(), "admin flag changed");
    Ok((StatusCode::OK, Json(MemberResponse::from(user))))
}
