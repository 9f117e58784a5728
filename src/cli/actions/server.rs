use crate::{
    api::{
        self,
        state::{AppConfig, AppState},
    },
    cli::{
        commands::integrations::{EmailApiOptions, ImageHostOptions},
        telemetry,
    },
    integrations::{self, email::ApiEmailSender, images::HttpImageHost},
    store,
};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: SecretString,
    pub frontend_base_url: String,
    pub session_ttl_seconds: i64,
    pub email_token_ttl_seconds: i64,
    pub bootstrap_admin_email: Option<String>,
    pub image_host: Option<ImageHostOptions>,
    pub email_api: Option<EmailApiOptions>,
    pub verify_template: String,
    pub contact_template: String,
    pub contact_recipient: Option<String>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the store cannot be opened or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let store = store::connect(args.dsn.expose_secret()).await?;

    let config = AppConfig::new(args.frontend_base_url)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_email_token_ttl_seconds(args.email_token_ttl_seconds)
        .with_bootstrap_admin_email(args.bootstrap_admin_email)
        .with_verify_template(args.verify_template)
        .with_contact_template(args.contact_template)
        .with_contact_recipient(args.contact_recipient);

    let mut state = AppState::new(store, config);

    if args.image_host.is_some() || args.email_api.is_some() {
        let client = integrations::http_client().context("Failed to build HTTP client")?;

        if let Some(image_host) = args.image_host {
            debug!(url = %image_host.url, "Image uploads enabled");
            state = state.with_images(Arc::new(HttpImageHost::new(
                client.clone(),
                image_host.url,
                image_host.preset,
            )));
        }

        if let Some(email_api) = args.email_api {
            debug!(url = %email_api.url, "Email API enabled");
            state = state.with_mailer(Arc::new(ApiEmailSender::new(
                client,
                email_api.url,
                email_api.service_id,
                email_api.user_id.expose_secret(),
            )));
        }
    }

    info!(port = args.port, "Starting rollcall");
    let result = api::new(args.port, Arc::new(state)).await;

    telemetry::shutdown_tracer();

    result
}
