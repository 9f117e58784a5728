//! Auth handlers and supporting modules.
//!
//! Members sign up with email and password (Argon2id hashed), confirm their
//! address through an emailed link, then log in to receive a session. The
//! session token travels as the `rollcall_session` cookie or as a bearer token;
//! only its SHA-256 hash is stored.
//!
//! ## Login Limiting
//!
//! - **Attempt Limit:** 5 failed logins per email within 15 minutes.
//! - **Reset:** a successful login clears the failure count.

pub mod login;
pub mod principal;
pub mod rate_limit;
pub mod session;
pub mod signup;
pub mod types;
mod utils;
pub mod verification;

pub use principal::{require_admin, require_member, Principal};
pub(crate) use utils::{normalize_email, valid_email};
pub use utils::{PASSWORD_MAX_CHARS, PASSWORD_MIN_CHARS};

#[cfg(test)]
pub(crate) use utils::hash_token;
