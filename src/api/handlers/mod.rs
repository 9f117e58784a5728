//! API handlers for Rollcall.
//!
//! Each handler authenticates with the request headers itself (see
//! [`auth::require_member`] and [`auth::require_admin`]), runs the pure rule
//! from `crate::roster`, and writes through the shared store.

pub mod auth;
pub mod contact;
pub mod events;
pub mod health;
pub mod leaderboard;
pub mod me;
pub mod registration;
pub mod root;
pub mod roster;
pub mod users;
