//! Outbound HTTP collaborators: the image host and the transactional email API.
//!
//! Both sit behind traits and share one `reqwest::Client` built by
//! [`http_client`].

pub mod email;
pub mod images;

use std::time::Duration;

use crate::APP_USER_AGENT;

pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Client used for every outbound call.
///
/// # Errors
/// Returns an error if the TLS backend cannot be initialized.
pub fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(APP_USER_AGENT)
        .timeout(HTTP_TIMEOUT)
        .build()
}
