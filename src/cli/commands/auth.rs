use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};

pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_EMAIL_TOKEN_TTL_SECONDS: &str = "email-token-ttl-seconds";
pub const ARG_BOOTSTRAP_ADMIN_EMAIL: &str = "bootstrap-admin-email";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL used for verification links and CORS")
                .env("ROLLCALL_FRONTEND_BASE_URL")
                .default_value("http://localhost:5173"),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session cookie TTL in seconds")
                .env("ROLLCALL_SESSION_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64).range(60..)),
        )
        .arg(
            Arg::new(ARG_EMAIL_TOKEN_TTL_SECONDS)
                .long(ARG_EMAIL_TOKEN_TTL_SECONDS)
                .help("Email verification token TTL in seconds")
                .env("ROLLCALL_EMAIL_TOKEN_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64).range(60..)),
        )
        .arg(
            Arg::new(ARG_BOOTSTRAP_ADMIN_EMAIL)
                .long(ARG_BOOTSTRAP_ADMIN_EMAIL)
                .help("Email that is granted admin when it signs up")
                .env("ROLLCALL_BOOTSTRAP_ADMIN_EMAIL"),
        )
}

#[derive(Debug, Clone)]
pub struct Options {
    pub frontend_base_url: String,
    pub session_ttl_seconds: i64,
    pub email_token_ttl_seconds: i64,
    pub bootstrap_admin_email: Option<String>,
}

impl Options {
    /// # Errors
    /// Returns an error if a defaulted argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        Ok(Self {
            frontend_base_url: matches
                .get_one::<String>(ARG_FRONTEND_BASE_URL)
                .cloned()
                .context("missing required argument: --frontend-base-url")?,
            session_ttl_seconds: matches
                .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .context("missing required argument: --session-ttl-seconds")?,
            email_token_ttl_seconds: matches
                .get_one::<i64>(ARG_EMAIL_TOKEN_TTL_SECONDS)
                .copied()
                .context("missing required argument: --email-token-ttl-seconds")?,
            bootstrap_admin_email: matches.get_one::<String>(ARG_BOOTSTRAP_ADMIN_EMAIL).cloned(),
        })
    }
}
