//! Password login.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::{error, info};

use super::{
    rate_limit::RateLimitDecision,
    session::{issue_session, session_cookie},
    types::{LoginRequest, LoginResponse},
    utils::{normalize_email, verify_password},
};
use crate::api::{error::ApiError, handlers::me::MemberResponse, state::AppState};

const INVALID_CREDENTIALS: &str = "Invalid email or password.";

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; session cookie set", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Email not verified"),
        (status = 429, description = "Too many failed attempts")
    ),
    tag = "auth"
)]
pub async fn login(
    state: Extension<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&request.email);
    let now = state.clock().now();
    let limiter = state.login_limiter();

    if limiter.check(&email, now) == RateLimitDecision::Limited {
        return Err(ApiError::TooManyRequests(
            "Too many failed attempts. Try again later.".to_string(),
        ));
    }

    let credentials = state.store().credentials(&email).await?;
    let Some(credentials) = credentials else {
        limiter.record_failure(&email, now);
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    let password = request.password;
    let stored_hash = credentials.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|err| {
            error!("Password verification task failed: {err}");
            ApiError::Internal
        })?;
    if !matches {
        limiter.record_failure(&email, now);
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }
    limiter.reset(&email);

    if !credentials.email_verified {
        return Err(ApiError::Forbidden("Email not verified.".to_string()));
    }

    let user = state
        .store()
        .user(credentials.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Member"))?;
    let (token, expires_at) = issue_session(&state, user.id).await?;
    info!(user_id = %user.id, "member logged in");

    let mut headers = HeaderMap::new();
    let cookie = session_cookie(state.config(), &token).map_err(|err| {
        error!("Failed to build session cookie: {err}");
        ApiError::Internal
    })?;
    headers.insert(SET_COOKIE, cookie);

    Ok((
        StatusCode::OK,
        headers,
        Json(LoginResponse {
            token,
            expires_at,
            user: MemberResponse::from(user),
        }),
    ))
}
