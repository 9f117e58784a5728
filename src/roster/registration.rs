//! Member registration state machine.
//!
//! A member is `Unregistered`, `Rsvped` or `SignedIn` for each event. The
//! planners below decide whether an action is allowed and what it changes;
//! stores apply the resulting [`Transition`] atomically and refuse it when the
//! member's state moved in the meantime.

use serde::Serialize;
use utoipa::ToSchema;

use super::{
    code::{self, CodeError},
    models::Event,
    window::WindowState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Unregistered,
    Rsvped,
    SignedIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Rsvp,
    SignIn,
    Cancel,
}

/// Planned change for one member and one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub action: Action,
    pub from: RegistrationStatus,
    pub to: RegistrationStatus,
    /// Points to add (negative when cancelling a credited sign-in).
    pub points_delta: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("RSVP is closed for this event.")]
    RsvpClosed,
    #[error("Sign-in is not open for this event.")]
    SignInClosed,
    #[error("Already RSVP'd.")]
    AlreadyRsvped,
    #[error("Already signed in.")]
    AlreadySignedIn,
    #[error("Not registered for this event.")]
    NotRegistered,
    #[error(transparent)]
    Code(#[from] CodeError),
}

/// # Errors
/// Fails unless RSVP is open and the member is unregistered.
pub fn plan_rsvp(
    status: RegistrationStatus,
    window: WindowState,
) -> Result<Transition, RegistrationError> {
    match status {
        RegistrationStatus::SignedIn => return Err(RegistrationError::AlreadySignedIn),
        RegistrationStatus::Rsvped => return Err(RegistrationError::AlreadyRsvped),
        RegistrationStatus::Unregistered => {}
    }
    if window != WindowState::RsvpOpen {
        return Err(RegistrationError::RsvpClosed);
    }
    Ok(Transition {
        action: Action::Rsvp,
        from: status,
        to: RegistrationStatus::Rsvped,
        points_delta: 0,
    })
}

/// Sign in with an attendance code, crediting the event's points once.
///
/// # Errors
/// Fails when sign-in is closed, the member already signed in, or the code is wrong.
pub fn plan_sign_in(
    status: RegistrationStatus,
    window: WindowState,
    event: &Event,
    entered_code: &str,
) -> Result<Transition, RegistrationError> {
    if window != WindowState::SignInOpen {
        return Err(RegistrationError::SignInClosed);
    }
    if status == RegistrationStatus::SignedIn {
        return Err(RegistrationError::AlreadySignedIn);
    }
    code::check(entered_code, &event.attendance_code)?;
    Ok(Transition {
        action: Action::SignIn,
        from: status,
        to: RegistrationStatus::SignedIn,
        points_delta: event.points().max(0),
    })
}

/// Drop an RSVP or attendance; credited points are taken back.
///
/// # Errors
/// Fails when the member holds no registration for the event.
pub fn plan_cancel(
    status: RegistrationStatus,
    event: &Event,
) -> Result<Transition, RegistrationError> {
    let points_delta = match status {
        RegistrationStatus::Unregistered => return Err(RegistrationError::NotRegistered),
        RegistrationStatus::Rsvped => 0,
        RegistrationStatus::SignedIn => -event.points().max(0),
    };
    Ok(Transition {
        action: Action::Cancel,
        from: status,
        to: RegistrationStatus::Unregistered,
        points_delta,
    })
}

/// New point total after a transition, never below zero.
#[must_use]
pub fn apply_points(current: i64, delta: i64) -> i64 {
    current.saturating_add(delta).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::models::fixtures::{at, event};
    use crate::roster::window::Window;

    #[test]
    fn rsvp_only_while_rsvp_open() {
        let transition = plan_rsvp(RegistrationStatus::Unregistered, WindowState::RsvpOpen);
        assert_eq!(
            transition.map(|t| (t.to, t.points_delta)),
            Ok((RegistrationStatus::Rsvped, 0))
        );
        assert_eq!(
            plan_rsvp(RegistrationStatus::Unregistered, WindowState::SignInOpen),
            Err(RegistrationError::RsvpClosed)
        );
        assert_eq!(
            plan_rsvp(RegistrationStatus::Unregistered, WindowState::Closed),
            Err(RegistrationError::RsvpClosed)
        );
    }

    #[test]
    fn duplicate_rsvp_rejected() {
        assert_eq!(
            plan_rsvp(RegistrationStatus::Rsvped, WindowState::RsvpOpen),
            Err(RegistrationError::AlreadyRsvped)
        );
        assert_eq!(
            plan_rsvp(RegistrationStatus::SignedIn, WindowState::RsvpOpen),
            Err(RegistrationError::AlreadySignedIn)
        );
    }

    #[test]
    fn sign_in_at_half_past_grants_points_once() {
        let event = event();
        let state = Window::for_event(&event).state_at(at(17, 30));
        let first = plan_sign_in(RegistrationStatus::Unregistered, state, &event, "abcdef");
        assert_eq!(
            first.map(|t| (t.to, t.points_delta)),
            Ok((RegistrationStatus::SignedIn, 5))
        );

        let second = plan_sign_in(RegistrationStatus::SignedIn, state, &event, "abcdef");
        assert_eq!(second, Err(RegistrationError::AlreadySignedIn));
    }

    #[test]
    fn already_signed_in_reported_before_code() {
        let event = event();
        let second = plan_sign_in(
            RegistrationStatus::SignedIn,
            WindowState::SignInOpen,
            &event,
            "zzzzzz",
        );
        assert_eq!(second, Err(RegistrationError::AlreadySignedIn));
    }

    #[test]
    fn sign_in_consumes_rsvp() {
        let event = event();
        let transition = plan_sign_in(
            RegistrationStatus::Rsvped,
            WindowState::SignInOpen,
            &event,
            "ABCDEF",
        );
        assert_eq!(
            transition.map(|t| (t.from, t.to)),
            Ok((RegistrationStatus::Rsvped, RegistrationStatus::SignedIn))
        );
    }

    #[test]
    fn sign_in_outside_window_rejected() {
        let event = event();
        let early = Window::for_event(&event).state_at(at(16, 0));
        assert_eq!(
            plan_sign_in(RegistrationStatus::Rsvped, early, &event, "ABCDEF"),
            Err(RegistrationError::SignInClosed)
        );
        let late = Window::for_event(&event).state_at(at(19, 30));
        assert_eq!(
            plan_sign_in(RegistrationStatus::Unregistered, late, &event, "ABCDEF"),
            Err(RegistrationError::SignInClosed)
        );
    }

    #[test]
    fn wrong_code_rejected() {
        let event = event();
        assert_eq!(
            plan_sign_in(
                RegistrationStatus::Unregistered,
                WindowState::SignInOpen,
                &event,
                "QWERTY"
            ),
            Err(RegistrationError::Code(CodeError::Mismatch))
        );
    }

    #[test]
    fn cancel_deducts_only_credited_points() {
        let event = event();
        assert_eq!(
            plan_cancel(RegistrationStatus::Rsvped, &event).map(|t| t.points_delta),
            Ok(0)
        );
        assert_eq!(
            plan_cancel(RegistrationStatus::SignedIn, &event).map(|t| t.points_delta),
            Ok(-5)
        );
        assert_eq!(
            plan_cancel(RegistrationStatus::Unregistered, &event),
            Err(RegistrationError::NotRegistered)
        );
    }

    #[test]
    fn points_floor_at_zero() {
        assert_eq!(apply_points(3, -5), 0);
        assert_eq!(apply_points(10, -5), 5);
        assert_eq!(apply_points(0, 5), 5);
    }
}
