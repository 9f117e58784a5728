use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use super::auth::require_member;
use crate::{
    api::{error::ApiError, state::AppState},
    roster::{
        leaderboard::{standings, Standing},
        page::{paginate, Page, PageRequest},
    },
};

#[utoipa::path(
    get,
    path = "/v1/leaderboard",
    params(PageRequest),
    responses(
        (status = 200, description = "Members ranked by points.", body = Page<Standing>),
        (status = 401, description = "Missing or invalid session."),
    ),
    tag = "leaderboard"
)]
pub async fn leaderboard(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    Query(request): Query<PageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_member(&headers, &state).await?;
    let users = state.store().all_users().await?;
    Ok((StatusCode::OK, Json(paginate(standings(users), request))))
}
