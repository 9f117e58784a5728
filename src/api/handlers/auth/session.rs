//! Session endpoints for cookie and bearer auth.

use axum::{
    extract::Extension,
    http::{
        header::{InvalidHeaderValue, AUTHORIZATION, COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use super::{
    types::SessionResponse,
    utils::{generate_token, hash_token},
};
use crate::{
    api::{
        error::ApiError,
        state::{AppConfig, AppState},
    },
    roster::models::User,
    store::TokenRecord,
};

pub const SESSION_COOKIE_NAME: &str = "rollcall_session";

#[utoipa::path(
    get,
    path = "/v1/auth/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    // Missing cookies are "no session", not an error.
    let response = match authenticate_session(&headers, &state).await? {
        Some(user) => (
            StatusCode::OK,
            Json(SessionResponse {
                user_id: user.id,
                email: user.email,
                is_admin: user.is_admin,
            }),
        )
            .into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    };
    Ok(response)
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(headers: HeaderMap, state: Extension<Arc<AppState>>) -> impl IntoResponse {
    if let Some(token) = extract_session_token(&headers) {
        if let Err(err) = state.store().delete_session(&hash_token(&token)).await {
            error!("Failed to delete session: {err}");
        }
    }

    // Always clear the cookie, even if the session record was missing.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers)
}

/// Resolve the session token on the request into its member.
///
/// Returns `Ok(None)` when the token is missing, unknown or expired.
pub(crate) async fn authenticate_session(
    headers: &HeaderMap,
    state: &AppState,
) -> Result<Option<User>, ApiError> {
    let Some(token) = extract_session_token(headers) else {
        return Ok(None);
    };
    let now = state.clock().now();
    let Some(user_id) = state.store().session_user(&hash_token(&token), now).await? else {
        return Ok(None);
    };
    Ok(state.store().user(user_id).await?)
}

/// Create a session row and return the raw token with its expiry.
pub(super) async fn issue_session(
    state: &AppState,
    user_id: Uuid,
) -> Result<(String, DateTime<Utc>), ApiError> {
    let token = generate_token().map_err(|err| {
        error!("Failed to generate session token: {err}");
        ApiError::Internal
    })?;
    let expires_at = state.clock().now() + Duration::seconds(state.config().session_ttl_seconds());
    state
        .store()
        .insert_session(TokenRecord {
            token_hash: hash_token(&token),
            user_id,
            expires_at,
        })
        .await?;
    Ok((token, expires_at))
}

/// Build an `HttpOnly` cookie for the session token.
pub(super) fn session_cookie(
    config: &AppConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(config: &AppConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let value = headers.get(COOKIE)?.to_str().ok()?;
    value.split(';').find_map(|pair| {
        let (key, val) = pair.trim().split_once('=')?;
        (key.trim() == SESSION_COOKIE_NAME && !val.trim().is_empty())
            .then(|| val.trim().to_string())
    })
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
