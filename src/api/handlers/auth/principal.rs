//! Authenticated principal extraction and authorization helpers.
//!
//! Flow Overview: read the session cookie or bearer token, resolve it to a
//! member, and hand that member to the handler. Admin checks happen on the
//! returned principal.

use axum::http::HeaderMap;
use uuid::Uuid;

use super::session::authenticate_session;
use crate::{
    api::{error::ApiError, state::AppState},
    roster::models::User,
};

/// Member resolved from the request's session.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user: User,
}

impl Principal {
    #[must_use]
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.is_admin
    }

    /// # Errors
    /// Returns `403` for members without the admin flag.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.user.is_admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Admin access required.".to_string()))
        }
    }
}

/// Resolve the session into a principal, or return `401` when there is none.
///
/// # Errors
/// Returns `401` without a live session and `500` on storage failures.
pub async fn require_member(headers: &HeaderMap, state: &AppState) -> Result<Principal, ApiError> {
    match authenticate_session(headers, state).await? {
        Some(user) => Ok(Principal { user }),
        None => Err(ApiError::Unauthorized("Sign in required.".to_string())),
    }
}

/// Resolve the session and require the admin flag.
///
/// # Errors
/// Returns `401` without a session and `403` for non-admins.
pub async fn require_admin(headers: &HeaderMap, state: &AppState) -> Result<Principal, ApiError> {
    let principal = require_member(headers, state).await?;
    principal.require_admin()?;
    Ok(principal)
}
