//! Public contact form, forwarded through the email API.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

use super::auth::{normalize_email, valid_email};
use crate::{
    api::{error::ApiError, state::AppState},
    integrations::email::EmailMessage,
    roster::validation::{max_words, require, DESCRIPTION_MAX_WORDS},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subject: String,
    pub message: String,
}

impl ContactRequest {
    fn into_message(self, recipient: &str, template: &str) -> Result<EmailMessage, ApiError> {
        let name = self.name.trim();
        let message = self.message.trim();
        require("name", name)?;
        require("message", message)?;
        max_words("message", message, DESCRIPTION_MAX_WORDS)?;

        let email = normalize_email(&self.email);
        if !valid_email(&email) {
            return Err(ApiError::bad_request("Invalid email address."));
        }
        Ok(EmailMessage::new(recipient, template)
            .with_param("from_name", name)
            .with_param("reply_to", email)
            .with_param("subject", self.subject.trim())
            .with_param("message", message))
    }
}

#[utoipa::path(
    post,
    path = "/v1/contact",
    request_body = ContactRequest,
    responses(
        (status = 202, description = "Message forwarded."),
        (status = 400, description = "Invalid message."),
        (status = 502, description = "Email delivery failed."),
        (status = 503, description = "No contact recipient configured."),
    ),
    tag = "contact"
)]
pub async fn contact(
    state: Extension<Arc<AppState>>,
    Json(request): Json<ContactRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(recipient) = state.config().contact_recipient() else {
        return Err(ApiError::Unavailable(
            "The contact form is not configured.".to_string(),
        ));
    };
    let message = request.into_message(recipient, state.config().contact_template())?;
    state.mailer().send(&message).await?;
    info!("contact message forwarded");
    Ok(StatusCode::ACCEPTED)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, message: &str) -> ContactRequest {
        ContactRequest {
            name: " Ada ".to_string(),
            email: email.to_string(),
            subject: "Hello".to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn message_params_filled() -> Result<(), ApiError> {
        let message = request("Ada@Example.com", "Can I join?")
            .into_message("board@club.org", "contact_form")?;
        assert_eq!(message.to_email, "board@club.org");
        assert_eq!(message.template_id, "contact_form");
        assert_eq!(message.params["from_name"], "Ada");
        assert_eq!(message.params["reply_to"], "ada@example.com");
        Ok(())
    }

    #[test]
    fn invalid_input_rejected() {
        assert!(request("not-an-email", "hi")
            .into_message("board@club.org", "t")
            .is_err());
        assert!(request("ada@example.com", "   ")
            .into_message("board@club.org", "t")
            .is_err());
    }
}
