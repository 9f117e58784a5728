//! Account creation.
//!
//! Flow Overview: validate the email, password and name fields, hash the
//! password with Argon2id, create the member, then email a verification link.
//! The member cannot log in until the link is used.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{
    types::{SignupRequest, SignupResponse},
    utils::{hash_password, normalize_email, valid_email, valid_password},
    verification::send_verification,
    PASSWORD_MAX_CHARS, PASSWORD_MIN_CHARS,
};
use crate::{
    api::{error::ApiError, state::AppState},
    roster::validation::require,
    store::{NewUser, StoreError},
};

#[utoipa::path(
    post,
    path = "/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created; verification email sent", body = SignupResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already registered")
    ),
    tag = "auth"
)]
pub async fn signup(
    state: Extension<Arc<AppState>>,
    Json(request): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(ApiError::bad_request("Invalid email address."));
    }
    if !valid_password(&request.password) {
        return Err(ApiError::bad_request(format!(
            "Password must be {PASSWORD_MIN_CHARS} to {PASSWORD_MAX_CHARS} characters."
        )));
    }
    require("first_name", &request.first_name)?;
    require("last_name", &request.last_name)?;

    let password = request.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|err| {
            error!("Password hashing task failed: {err}");
            ApiError::Internal
        })?
        .map_err(|err| {
            error!("Failed to hash password: {err}");
            ApiError::Internal
        })?;

    let is_admin = state.config().is_bootstrap_admin(&email);
    let user = state
        .store()
        .create_user(NewUser {
            email,
            password_hash,
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            major: request.major.trim().to_string(),
            year: request.year.trim().to_string(),
            member_id: request.member_id.trim().to_string(),
            is_admin,
        })
        .await
        .map_err(|err| match err {
            StoreError::Duplicate => {
                ApiError::Conflict("An account with this email already exists.".to_string())
            }
            other => other.into(),
        })?;
    info!(user_id = %user.id, is_admin, "member signed up");

    let verification_sent = match send_verification(&state, &user).await {
        Ok(()) => true,
        Err(err) => {
            warn!(user_id = %user.id, "verification email not sent: {err}");
            false
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            user_id: user.id,
            email: user.email,
            verification_sent,
        }),
    ))
}
