//! Shared handler state and runtime configuration.

use std::sync::Arc;

use super::handlers::auth::rate_limit::{FailureWindowLimiter, RateLimiter};
use crate::{
    clock::{Clock, SystemClock},
    integrations::{
        email::{EmailSender, LogEmailSender},
        images::{DisabledImageHost, ImageHost},
    },
    store::Store,
};

const DEFAULT_SESSION_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_EMAIL_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_VERIFY_TEMPLATE: &str = "verify_email";
const DEFAULT_CONTACT_TEMPLATE: &str = "contact_form";

#[derive(Clone, Debug)]
pub struct AppConfig {
    frontend_base_url: String,
    session_ttl_seconds: i64,
    email_token_ttl_seconds: i64,
    bootstrap_admin_email: Option<String>,
    verify_template: String,
    contact_template: String,
    contact_recipient: Option<String>,
}

impl AppConfig {
    /// Defaults: 7 day sessions and 24 hour verification links.
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            email_token_ttl_seconds: DEFAULT_EMAIL_TOKEN_TTL_SECONDS,
            bootstrap_admin_email: None,
            verify_template: DEFAULT_VERIFY_TEMPLATE.to_string(),
            contact_template: DEFAULT_CONTACT_TEMPLATE.to_string(),
            contact_recipient: None,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_email_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.email_token_ttl_seconds = seconds;
        self
    }

    /// Signups with this email are created as admins.
    #[must_use]
    pub fn with_bootstrap_admin_email(mut self, email: Option<String>) -> Self {
        self.bootstrap_admin_email = email.map(|email| email.trim().to_lowercase());
        self
    }

    #[must_use]
    pub fn with_verify_template(mut self, template: String) -> Self {
        self.verify_template = template;
        self
    }

    #[must_use]
    pub fn with_contact_template(mut self, template: String) -> Self {
        self.contact_template = template;
        self
    }

    #[must_use]
    pub fn with_contact_recipient(mut self, recipient: Option<String>) -> Self {
        self.contact_recipient = recipient;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn email_token_ttl_seconds(&self) -> i64 {
        self.email_token_ttl_seconds
    }

    #[must_use]
    pub fn is_bootstrap_admin(&self, email_normalized: &str) -> bool {
        self.bootstrap_admin_email.as_deref() == Some(email_normalized)
    }

    #[must_use]
    pub fn verify_template(&self) -> &str {
        &self.verify_template
    }

    #[must_use]
    pub fn contact_template(&self) -> &str {
        &self.contact_template
    }

    #[must_use]
    pub fn contact_recipient(&self) -> Option<&str> {
        self.contact_recipient.as_deref()
    }

    /// Only mark cookies secure when the frontend is served over HTTPS.
    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

/// Everything a handler needs, shared behind one `Extension<Arc<AppState>>`.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn Store>,
    config: AppConfig,
    clock: Arc<dyn Clock>,
    mailer: Arc<dyn EmailSender>,
    images: Arc<dyn ImageHost>,
    login_limiter: Arc<dyn RateLimiter>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: AppConfig) -> Self {
        Self {
            store,
            config,
            clock: Arc::new(SystemClock),
            mailer: Arc::new(LogEmailSender),
            images: Arc::new(DisabledImageHost),
            login_limiter: Arc::new(FailureWindowLimiter::default()),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_mailer(mut self, mailer: Arc<dyn EmailSender>) -> Self {
        self.mailer = mailer;
        self
    }

    #[must_use]
    pub fn with_images(mut self, images: Arc<dyn ImageHost>) -> Self {
        self.images = images;
        self
    }

    #[must_use]
    pub fn with_login_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.login_limiter = limiter;
        self
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn mailer(&self) -> &dyn EmailSender {
        self.mailer.as_ref()
    }

    pub fn images(&self) -> &dyn ImageHost {
        self.images.as_ref()
    }

    pub fn login_limiter(&self) -> &dyn RateLimiter {
        self.login_limiter.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_and_overrides() {
        let config = AppConfig::new("https://club.example.com".to_string());
        assert_eq!(config.session_ttl_seconds(), DEFAULT_SESSION_TTL_SECONDS);
        assert_eq!(config.verify_template(), DEFAULT_VERIFY_TEMPLATE);
        assert!(config.session_cookie_secure());
        assert!(config.contact_recipient().is_none());

        let config = config
            .with_session_ttl_seconds(60)
            .with_email_token_ttl_seconds(120)
            .with_bootstrap_admin_email(Some(" Chair@Example.com ".to_string()))
            .with_contact_recipient(Some("board@example.com".to_string()));
        assert_eq!(config.session_ttl_seconds(), 60);
        assert_eq!(config.email_token_ttl_seconds(), 120);
        assert!(config.is_bootstrap_admin("chair@example.com"));
        assert!(!config.is_bootstrap_admin("member@example.com"));
        assert_eq!(config.contact_recipient(), Some("board@example.com"));
    }

    #[test]
    fn plain_http_frontend_gets_insecure_cookie() {
        let config = AppConfig::new("http://localhost:5173".to_string());
        assert!(!config.session_cookie_secure());
    }
}
