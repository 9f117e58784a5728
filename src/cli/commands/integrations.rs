//! Image host, email API and contact form arguments.

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use url::Url;

pub const ARG_IMAGE_UPLOAD_URL: &str = "image-upload-url";
pub const ARG_IMAGE_UPLOAD_PRESET: &str = "image-upload-preset";
pub const ARG_EMAIL_API_URL: &str = "email-api-url";
pub const ARG_EMAIL_SERVICE_ID: &str = "email-service-id";
pub const ARG_EMAIL_USER_ID: &str = "email-user-id";
pub const ARG_EMAIL_VERIFY_TEMPLATE: &str = "email-verify-template";
pub const ARG_EMAIL_CONTACT_TEMPLATE: &str = "email-contact-template";
pub const ARG_CONTACT_RECIPIENT: &str = "contact-recipient";

fn url_parser(value: &str) -> std::result::Result<Url, String> {
    Url::parse(value).map_err(|err| format!("invalid URL: {err}"))
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_IMAGE_UPLOAD_URL)
                .long(ARG_IMAGE_UPLOAD_URL)
                .help("Image host upload endpoint; photo uploads are disabled without it")
                .env("ROLLCALL_IMAGE_UPLOAD_URL")
                .requires(ARG_IMAGE_UPLOAD_PRESET)
                .value_parser(url_parser),
        )
        .arg(
            Arg::new(ARG_IMAGE_UPLOAD_PRESET)
                .long(ARG_IMAGE_UPLOAD_PRESET)
                .help("Unsigned upload preset sent with each image")
                .env("ROLLCALL_IMAGE_UPLOAD_PRESET"),
        )
        .arg(
            Arg::new(ARG_EMAIL_API_URL)
                .long(ARG_EMAIL_API_URL)
                .help("Transactional email API endpoint; emails are only logged without it")
                .env("ROLLCALL_EMAIL_API_URL")
                .requires_ifs([
                    (clap::builder::ArgPredicate::IsPresent, ARG_EMAIL_SERVICE_ID),
                    (clap::builder::ArgPredicate::IsPresent, ARG_EMAIL_USER_ID),
                ])
                .value_parser(url_parser),
        )
        .arg(
            Arg::new(ARG_EMAIL_SERVICE_ID)
                .long(ARG_EMAIL_SERVICE_ID)
                .help("Email API service id")
                .env("ROLLCALL_EMAIL_SERVICE_ID"),
        )
        .arg(
            Arg::new(ARG_EMAIL_USER_ID)
                .long(ARG_EMAIL_USER_ID)
                .help("Email API user (public key) id")
                .env("ROLLCALL_EMAIL_USER_ID"),
        )
        .arg(
            Arg::new(ARG_EMAIL_VERIFY_TEMPLATE)
                .long(ARG_EMAIL_VERIFY_TEMPLATE)
                .help("Template id for verification emails")
                .env("ROLLCALL_EMAIL_VERIFY_TEMPLATE")
                .default_value("verify_email"),
        )
        .arg(
            Arg::new(ARG_EMAIL_CONTACT_TEMPLATE)
                .long(ARG_EMAIL_CONTACT_TEMPLATE)
                .help("Template id for contact form messages")
                .env("ROLLCALL_EMAIL_CONTACT_TEMPLATE")
                .default_value("contact_form"),
        )
        .arg(
            Arg::new(ARG_CONTACT_RECIPIENT)
                .long(ARG_CONTACT_RECIPIENT)
                .help("Address that receives contact form messages")
                .env("ROLLCALL_CONTACT_RECIPIENT"),
        )
}

#[derive(Debug, Clone)]
pub struct ImageHostOptions {
    pub url: Url,
    pub preset: String,
}

#[derive(Debug, Clone)]
pub struct EmailApiOptions {
    pub url: Url,
    pub service_id: String,
    pub user_id: SecretString,
}

#[derive(Debug, Clone)]
pub struct Options {
    pub image_host: Option<ImageHostOptions>,
    pub email_api: Option<EmailApiOptions>,
    pub verify_template: String,
    pub contact_template: String,
    pub contact_recipient: Option<String>,
}

impl Options {
    /// # Errors
    /// Returns an error if an endpoint is configured without its companion arguments.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let image_host = match matches.get_one::<Url>(ARG_IMAGE_UPLOAD_URL) {
            Some(url) => Some(ImageHostOptions {
                url: url.clone(),
                preset: matches
                    .get_one::<String>(ARG_IMAGE_UPLOAD_PRESET)
                    .cloned()
                    .context("missing required argument: --image-upload-preset")?,
            }),
            None => None,
        };

        let email_api = match matches.get_one::<Url>(ARG_EMAIL_API_URL) {
            Some(url) => Some(EmailApiOptions {
                url: url.clone(),
                service_id: matches
                    .get_one::<String>(ARG_EMAIL_SERVICE_ID)
                    .cloned()
                    .context("missing required argument: --email-service-id")?,
                user_id: matches
                    .get_one::<String>(ARG_EMAIL_USER_ID)
                    .cloned()
                    .map(SecretString::from)
                    .context("missing required argument: --email-user-id")?,
            }),
            None => None,
        };

        Ok(Self {
            image_host,
            email_api,
            verify_template: matches
                .get_one::<String>(ARG_EMAIL_VERIFY_TEMPLATE)
                .cloned()
                .context("missing required argument: --email-verify-template")?,
            contact_template: matches
                .get_one::<String>(ARG_EMAIL_CONTACT_TEMPLATE)
                .cloned()
                .context("missing required argument: --email-contact-template")?,
            contact_recipient: matches.get_one::<String>(ARG_CONTACT_RECIPIENT).cloned(),
        })
    }
}
