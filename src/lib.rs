//! # Rollcall (membership, events and attendance points)
//!
//! `rollcall` is the API behind a student organization's member portal. Members
//! sign up, keep a profile, RSVP to upcoming events and sign in at the door with
//! a six-letter attendance code. Each sign-in credits the event's points, and the
//! point totals feed the leaderboard.
//!
//! ## Registration Windows
//!
//! Every event has a sign-in window that opens a configurable number of hours
//! before the start and closes at the end (two hours after the start when no end
//! is set). Before the window members may RSVP; inside it they may sign in;
//! afterwards registration is closed.
//!
//! - **Single credit:** a member is credited at most once per event. A second
//!   sign-in reports "already signed in".
//! - **Cancellation:** cancelling drops the RSVP or attendance and, when points
//!   were credited, deducts the event's value without going below zero.
//!
//! ## Storage
//!
//! Handlers talk to an injected [`store::Store`]. `PostgreSQL` is the production
//! driver; a `memory://` DSN selects the in-process driver used by tests and
//! local runs. Registration changes and point adjustments are applied together.
//!
//! ## Authorization
//!
//! Any verified member may browse events and register. Creating and editing
//! events, exporting rosters and managing members require the admin flag.
//! Only an event's creator may delete it.

pub mod api;
pub mod cli;
pub mod clock;
pub mod integrations;
pub mod roster;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
