//! Domain rules for events, registration and points.
//!
//! Everything here is pure: no storage, no clock. Handlers read the current
//! time and records, ask these modules what is allowed, then hand the outcome
//! to the store.

pub mod code;
pub mod export;
pub mod leaderboard;
pub mod models;
pub mod page;
pub mod registration;
pub mod schedule;
pub mod validation;
pub mod window;
