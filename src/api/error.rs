//! Handler error type and its HTTP mapping.
//!
//! Every failure is returned as `{"error": "<message>"}` with a matching status.
//! Storage failures are logged and reported as a bare `500`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::{
    integrations::{email::EmailError, images::ImageHostError},
    roster::{code::CodeError, registration::RegistrationError, validation::ValidationError},
    store::StoreError,
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    TooManyRequests(String),
    #[error("{0}")]
    BadGateway(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => Self::Conflict("Record already exists.".to_string()),
            StoreError::NotFound => Self::not_found("Record"),
            StoreError::StaleRegistration => Self::Conflict(
                "Registration changed in another request; reload and try again.".to_string(),
            ),
            StoreError::Database(err) => {
                error!("Database error: {err}");
                Self::Internal
            }
            StoreError::Corrupt(detail) => {
                error!("Corrupt stored data: {detail}");
                Self::Internal
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<CodeError> for ApiError {
    fn from(err: CodeError) -> Self {
        match err {
            CodeError::Malformed => Self::BadRequest(err.to_string()),
            CodeError::Mismatch => Self::Forbidden(err.to_string()),
        }
    }
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Code(code) => code.into(),
            RegistrationError::NotRegistered => Self::NotFound(err.to_string()),
            RegistrationError::RsvpClosed
            | RegistrationError::SignInClosed
            | RegistrationError::AlreadyRsvped
            | RegistrationError::AlreadySignedIn => Self::Conflict(err.to_string()),
        }
    }
}

impl From<ImageHostError> for ApiError {
    fn from(err: ImageHostError) -> Self {
        match err {
            ImageHostError::NotConfigured => Self::Unavailable(err.to_string()),
            other => {
                error!("Image upload failed: {other}");
                Self::BadGateway("Image upload failed.".to_string())
            }
        }
    }
}

impl From<EmailError> for ApiError {
    fn from(err: EmailError) -> Self {
        error!("Email delivery failed: {err}");
        Self::BadGateway("Email delivery failed.".to_string())
    }
}
