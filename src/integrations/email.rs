//! Email delivery.
//!
//! Messages name a template on the email API and carry its parameters. When no
//! API URL is configured the [`LogEmailSender`] is used, which only logs.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, instrument};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("email API request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("email API returned {0}")]
    Status(u16),
}

#[derive(Clone, Debug, PartialEq)]
pub struct EmailMessage {
    pub to_email: String,
    pub template_id: String,
    pub params: Map<String, Value>,
}

impl EmailMessage {
    #[must_use]
    pub fn new(to_email: impl Into<String>, template_id: impl Into<String>) -> Self {
        Self {
            to_email: to_email.into(),
            template_id: template_id.into(),
            params: Map::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver `message`; any error is reported to the caller.
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

/// Local dev sender that logs the message instead of sending real email.
#[derive(Clone, Debug, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        info!(
            to_email = %message.to_email,
            template = %message.template_id,
            params = %serde_json::Value::Object(message.params.clone()),
            "email send stub"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct ApiPayload<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: Map<String, Value>,
}

/// Sender for a hosted template email API.
#[derive(Clone, Debug)]
pub struct ApiEmailSender {
    client: reqwest::Client,
    url: Url,
    service_id: String,
    user_id: String,
}

impl ApiEmailSender {
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        url: Url,
        service_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            url,
            service_id: service_id.into(),
            user_id: user_id.into(),
        }
    }

    fn payload<'a>(&'a self, message: &'a EmailMessage) -> ApiPayload<'a> {
        let mut template_params = message.params.clone();
        template_params.insert("to_email".to_string(), message.to_email.clone().into());
        ApiPayload {
            service_id: &self.service_id,
            template_id: &message.template_id,
            user_id: &self.user_id,
            template_params,
        }
    }
}

#[async_trait]
impl EmailSender for ApiEmailSender {
    #[instrument(skip(self, message), fields(template = %message.template_id))]
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&self.payload(message))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EmailError::Status(status.as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn payload_carries_ids_and_recipient() -> Result<()> {
        let sender = ApiEmailSender::new(
            reqwest::Client::new(),
            Url::parse("https://mail.example.com/api/v1.0/email/send")?,
            "service_1",
            "public_key",
        );
        let message = EmailMessage::new("ada@example.com", "template_verify")
            .with_param("verify_url", "https://app.example.com/verify-email#token=abc");

        let payload = serde_json::to_value(sender.payload(&message))?;
        assert_eq!(payload["service_id"], "service_1");
        assert_eq!(payload["template_id"], "template_verify");
        assert_eq!(payload["user_id"], "public_key");
        assert_eq!(payload["template_params"]["to_email"], "ada@example.com");
        assert_eq!(
            payload["template_params"]["verify_url"],
            "https://app.example.com/verify-email#token=abc"
        );
        Ok(())
    }

    #[tokio::test]
    async fn log_sender_always_succeeds() {
        let message = EmailMessage::new("ada@example.com", "template_contact");
        assert!(LogEmailSender.send(&message).await.is_ok());
    }
}
