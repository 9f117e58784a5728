//! Registration window for an event.
//!
//! With start `S`, end `E` and an offset of `H` hours:
//! RSVP is open while `now < S - H`, sign-in is open while `S - H <= now <= E`,
//! and registration is closed otherwise. Events with RSVP disabled are closed
//! until the sign-in window opens.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::models::Event;

/// Upper bound for the sign-in offset (one week).
pub const MAX_OPENS_HOURS_BEFORE: u32 = 168;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WindowState {
    RsvpOpen,
    SignInOpen,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    opens_at: DateTime<Utc>,
    closes_at: DateTime<Utc>,
    rsvp_enabled: bool,
}

impl Window {
    #[must_use]
    pub fn new(
        starts_at: DateTime<Utc>,
        closes_at: DateTime<Utc>,
        opens_hours_before: u32,
        rsvp_enabled: bool,
    ) -> Self {
        let offset = Duration::hours(i64::from(opens_hours_before.min(MAX_OPENS_HOURS_BEFORE)));
        Self {
            opens_at: starts_at - offset,
            closes_at,
            rsvp_enabled,
        }
    }

    #[must_use]
    pub fn for_event(event: &Event) -> Self {
        Self::new(
            event.starts_at(),
            event.ends_at(),
            event.fields.sign_in_opens_hours_before,
            event.fields.rsvp_enabled,
        )
    }

    /// Window state of `event` at `now`.
    #[must_use]
    pub fn at(event: &Event, now: DateTime<Utc>) -> WindowState {
        Self::for_event(event).state_at(now)
    }

    /// When sign-in opens (and RSVP closes).
    #[must_use]
    pub fn opens_at(&self) -> DateTime<Utc> {
        self.opens_at
    }

    #[must_use]
    pub fn closes_at(&self) -> DateTime<Utc> {
        self.closes_at
    }

    #[must_use]
    pub fn state_at(&self, now: DateTime<Utc>) -> WindowState {
        if now < self.opens_at {
            if self.rsvp_enabled {
                WindowState::RsvpOpen
            } else {
                WindowState::Closed
            }
        } else if now <= self.closes_at {
            WindowState::SignInOpen
        } else {
            WindowState::Closed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::models::fixtures::{at, event};

    #[test]
    fn rsvp_open_before_offset() {
        let window = Window::for_event(&event());
        assert_eq!(window.state_at(at(16, 59)), WindowState::RsvpOpen);
    }

    #[test]
    fn sign_in_opens_exactly_at_offset() {
        let window = Window::for_event(&event());
        assert_eq!(window.opens_at(), at(17, 0));
        assert_eq!(window.state_at(at(17, 0)), WindowState::SignInOpen);
        assert_eq!(window.state_at(at(17, 30)), WindowState::SignInOpen);
    }

    #[test]
    fn sign_in_includes_end_instant() {
        let window = Window::for_event(&event());
        assert_eq!(window.state_at(at(19, 0)), WindowState::SignInOpen);
        assert_eq!(window.state_at(at(19, 1)), WindowState::Closed);
    }

    #[test]
    fn default_end_is_two_hours_after_start() {
        let mut event = event();
        event.fields.ends_at = None;
        let window = Window::for_event(&event);
        assert_eq!(window.closes_at(), at(20, 0));
        assert_eq!(window.state_at(at(19, 59)), WindowState::SignInOpen);
        assert_eq!(window.state_at(at(20, 1)), WindowState::Closed);
    }

    #[test]
    fn zero_offset_opens_at_start() {
        let mut event = event();
        event.fields.sign_in_opens_hours_before = 0;
        let window = Window::for_event(&event);
        assert_eq!(window.state_at(at(17, 59)), WindowState::RsvpOpen);
        assert_eq!(window.state_at(at(18, 0)), WindowState::SignInOpen);
    }

    #[test]
    fn rsvp_disabled_is_closed_before_window() {
        let mut event = event();
        event.fields.rsvp_enabled = false;
        let window = Window::for_event(&event);
        assert_eq!(window.state_at(at(12, 0)), WindowState::Closed);
        assert_eq!(window.state_at(at(17, 30)), WindowState::SignInOpen);
    }
}
