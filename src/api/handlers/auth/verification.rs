//! Email verification endpoints.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use chrono::Duration;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{
    types::{ResendVerificationRequest, VerifyEmailRequest},
    utils::{build_verify_url, generate_token, hash_token, normalize_email},
};
use crate::{
    api::{error::ApiError, state::AppState},
    integrations::email::EmailMessage,
    roster::models::User,
    store::TokenRecord,
};

/// Store a fresh verification token for `user` and email the link.
pub(super) async fn send_verification(state: &AppState, user: &User) -> Result<(), ApiError> {
    let token = generate_token().map_err(|err| {
        error!("Failed to generate verification token: {err}");
        ApiError::Internal
    })?;
    let expires_at =
        state.clock().now() + Duration::seconds(state.config().email_token_ttl_seconds());
    state
        .store()
        .insert_verification_token(TokenRecord {
            token_hash: hash_token(&token),
            user_id: user.id,
            expires_at,
        })
        .await?;

    let message = EmailMessage::new(&user.email, state.config().verify_template())
        .with_param("to_name", user.full_name())
        .with_param(
            "verify_url",
            build_verify_url(state.config().frontend_base_url(), &token),
        );
    state.mailer().send(&message).await?;
    Ok(())
}

/// Verify the email link by consuming the hashed token and activating the member.
#[utoipa::path(
    post,
    path = "/v1/auth/verify-email",
    request_body = VerifyEmailRequest,
    responses(
        (status = 204, description = "Email verified"),
        (status = 400, description = "Invalid or expired token")
    ),
    tag = "auth"
)]
pub async fn verify_email(
    state: Extension<Arc<AppState>>,
    Json(request): Json<VerifyEmailRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = request.token.trim();
    if token.is_empty() {
        return Err(ApiError::bad_request("Missing token."));
    }

    let now = state.clock().now();
    let Some(user_id) = state
        .store()
        .consume_verification_token(&hash_token(token), now)
        .await?
    else {
        return Err(ApiError::bad_request("Invalid or expired token."));
    };
    state.store().mark_email_verified(user_id).await?;
    info!(%user_id, "email verified");
    Ok(StatusCode::NO_CONTENT)
}

/// Send a new verification link. Always `204` so the endpoint does not reveal
/// which addresses have accounts.
#[utoipa::path(
    post,
    path = "/v1/auth/resend-verification",
    request_body = ResendVerificationRequest,
    responses(
        (status = 204, description = "Verification email queued when applicable")
    ),
    tag = "auth"
)]
pub async fn resend_verification(
    state: Extension<Arc<AppState>>,
    Json(request): Json<ResendVerificationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&request.email);
    let Some(credentials) = state.store().credentials(&email).await? else {
        return Ok(StatusCode::NO_CONTENT);
    };
    if credentials.email_verified {
        return Ok(StatusCode::NO_CONTENT);
    }
    if let Some(user) = state.store().user(credentials.user_id).await? {
        if let Err(err) = send_verification(&state, &user).await {
            warn!(user_id = %user.id, "verification resend failed: {err}");
        }
    }
    Ok(StatusCode::NO_CONTENT)
}
