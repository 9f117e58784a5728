//! Map validated CLI arguments to the action the binary runs.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, integrations};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;
    let integration_opts = integrations::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn: SecretString::from(dsn),
        frontend_base_url: auth_opts.frontend_base_url,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        email_token_ttl_seconds: auth_opts.email_token_ttl_seconds,
        bootstrap_admin_email: auth_opts.bootstrap_admin_email,
        image_host: integration_opts.image_host,
        email_api: integration_opts.email_api,
        verify_template: integration_opts.verify_template,
        contact_template: integration_opts.contact_template,
        contact_recipient: integration_opts.contact_recipient,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn server_action_from_env() {
        temp_env::with_vars(
            [
                ("ROLLCALL_DSN", Some("postgres://rollcall@localhost:5432/rollcall")),
                ("ROLLCALL_PORT", Some("8181")),
                ("ROLLCALL_CONTACT_RECIPIENT", Some("board@club.org")),
                ("ROLLCALL_IMAGE_UPLOAD_URL", None),
                ("ROLLCALL_EMAIL_API_URL", None),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["rollcall"]);
                let result = handler(&matches);
                assert!(result.is_ok());
                if let Ok(Action::Server(args)) = result {
                    assert_eq!(args.port, 8181);
                    assert_eq!(
                        args.dsn.expose_secret(),
                        "postgres://rollcall@localhost:5432/rollcall"
                    );
                    assert_eq!(args.contact_recipient.as_deref(), Some("board@club.org"));
                    assert!(args.image_host.is_none());
                    assert!(args.email_api.is_none());
                }
            },
        );
    }
}
