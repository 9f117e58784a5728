//! Request/response types for event endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    api::{error::ApiError, handlers::auth::Principal},
    roster::{
        code,
        models::{Answer, Event, EventFields, Question, Registration, Responses},
        page::PageRequest,
        registration::RegistrationStatus,
        schedule::Scope,
        window::{Window, WindowState},
    },
};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    pub name: String,
    pub starts_at: DateTime<Utc>,
    /// Defaults to two hours after `starts_at`.
    pub ends_at: Option<DateTime<Utc>>,
    pub location: String,
    pub committee: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub sign_in_opens_hours_before: u32,
    #[serde(default = "default_true")]
    pub rsvp_enabled: bool,
    #[serde(default)]
    pub questions: Vec<Question>,
    /// Generated when omitted.
    pub attendance_code: Option<String>,
}

impl CreateEventRequest {
    pub(super) fn into_parts(self) -> Result<(EventFields, String), ApiError> {
        let attendance_code = match self.attendance_code.as_deref() {
            Some(entered) => code::normalize(entered)?,
            None => code::generate(),
        };
        let fields = EventFields {
            name: self.name.trim().to_string(),
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            location: self.location.trim().to_string(),
            committee: self.committee.trim().to_string(),
            description: self.description.trim().to_string(),
            points: self.points,
            sign_in_opens_hours_before: self.sign_in_opens_hours_before,
            rsvp_enabled: self.rsvp_enabled,
            questions: self.questions,
        };
        Ok((fields, attendance_code))
    }
}

/// Partial event edit; omitted fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateEventRequest {
    pub name: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub committee: Option<String>,
    pub description: Option<String>,
    pub points: Option<i64>,
    pub sign_in_opens_hours_before: Option<u32>,
    pub rsvp_enabled: Option<bool>,
    pub questions: Option<Vec<Question>>,
}

impl UpdateEventRequest {
    pub(super) fn apply(self, mut fields: EventFields) -> EventFields {
        let trim = |value: String| value.trim().to_string();
        if let Some(name) = self.name {
            fields.name = trim(name);
        }
        if let Some(starts_at) = self.starts_at {
            fields.starts_at = starts_at;
        }
        if let Some(ends_at) = self.ends_at {
            fields.ends_at = Some(ends_at);
        }
        if let Some(location) = self.location {
            fields.location = trim(location);
        }
        if let Some(committee) = self.committee {
            fields.committee = trim(committee);
        }
        if let Some(description) = self.description {
            fields.description = trim(description);
        }
        if let Some(points) = self.points {
            fields.points = points;
        }
        if let Some(hours) = self.sign_in_opens_hours_before {
            fields.sign_in_opens_hours_before = hours;
        }
        if let Some(rsvp_enabled) = self.rsvp_enabled {
            fields.rsvp_enabled = rsvp_enabled;
        }
        if let Some(questions) = self.questions {
            fields.questions = questions;
        }
        fields
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct EventListQuery {
    pub scope: Option<Scope>,
    /// Case-insensitive search on name, committee and location.
    pub q: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

impl EventListQuery {
    pub(super) fn page_request(&self) -> PageRequest {
        PageRequest {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventResponse {
    pub id: Uuid,
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub location: String,
    pub committee: String,
    pub description: String,
    pub points: i64,
    pub sign_in_opens_hours_before: u32,
    pub rsvp_enabled: bool,
    pub questions: Vec<Question>,
    pub photo_url: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    /// Only shown to admins.
    pub attendance_code: Option<String>,
    pub window: WindowState,
    pub sign_in_opens_at: DateTime<Utc>,
    pub sign_in_closes_at: DateTime<Utc>,
    pub rsvp_count: usize,
    pub attendee_count: usize,
    /// The viewer's own registration state.
    pub status: RegistrationStatus,
}

impl EventResponse {
    #[must_use]
    pub fn for_viewer(event: Event, viewer: &Principal, now: DateTime<Utc>) -> Self {
        let window = Window::for_event(&event);
        let status = viewer.user.status_for(event.id);
        let ends_at = event.ends_at();
        let attendance_code = viewer.is_admin().then_some(event.attendance_code);
        Self {
            id: event.id,
            name: event.fields.name,
            starts_at: event.fields.starts_at,
            ends_at,
            location: event.fields.location,
            committee: event.fields.committee,
            description: event.fields.description,
            points: event.fields.points,
            sign_in_opens_hours_before: event.fields.sign_in_opens_hours_before,
            rsvp_enabled: event.fields.rsvp_enabled,
            questions: event.fields.questions,
            photo_url: event.photo_url,
            created_by: event.created_by,
            created_at: event.created_at,
            attendance_code,
            window: window.state_at(now),
            sign_in_opens_at: window.opens_at(),
            sign_in_closes_at: window.closes_at(),
            rsvp_count: event.rsvp_attendees.len(),
            attendee_count: event.attendees.len(),
            status,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CodeResponse {
    pub attendance_code: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PhotoResponse {
    pub photo_url: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RsvpRequest {
    /// One answer per question, by position.
    #[serde(default)]
    #[schema(value_type = Vec<Option<Answer>>)]
    pub responses: Responses,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SignInRequest {
    pub code: String,
    /// Replaces any answers given at RSVP time when present.
    #[schema(value_type = Option<Vec<Option<Answer>>>)]
    pub responses: Option<Responses>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RegistrationResponse {
    pub event_id: Uuid,
    pub window: WindowState,
    pub sign_in_opens_at: DateTime<Utc>,
    pub sign_in_closes_at: DateTime<Utc>,
    pub status: RegistrationStatus,
    pub rsvped_at: Option<DateTime<Utc>>,
    pub attended_at: Option<DateTime<Utc>>,
    #[schema(value_type = Vec<Option<Answer>>)]
    pub responses: Responses,
    /// The member's point total after the last change.
    pub points: i64,
}

impl RegistrationResponse {
    #[must_use]
    pub fn new(
        event: &Event,
        registration: Option<Registration>,
        points: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let window = Window::for_event(event);
        let status = registration
            .as_ref()
            .map_or(RegistrationStatus::Unregistered, Registration::status);
        let (rsvped_at, attended_at, responses) = registration.map_or_else(
            || (None, None, Vec::new()),
            |r| (r.rsvped_at, r.attended_at, r.responses),
        );
        Self {
            event_id: event.id,
            window: window.state_at(now),
            sign_in_opens_at: window.opens_at(),
            sign_in_closes_at: window.closes_at(),
            status,
            rsvped_at,
            attended_at,
            responses,
            points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::models::fixtures::{at, event, fields, user};

    #[test]
    fn update_keeps_omitted_fields() {
        let update = UpdateEventRequest {
            name: Some("  Social ".to_string()),
            points: Some(10),
            ..UpdateEventRequest::default()
        };
        let updated = update.apply(fields());
        assert_eq!(updated.name, "Social");
        assert_eq!(updated.points, 10);
        assert_eq!(updated.location, fields().location);
        assert_eq!(updated.ends_at, fields().ends_at);
    }

    #[test]
    fn create_normalizes_or_generates_code() -> Result<(), ApiError> {
        let request = CreateEventRequest {
            name: "Social".to_string(),
            starts_at: at(18, 0),
            ends_at: None,
            location: "Quad".to_string(),
            committee: "Events".to_string(),
            description: String::new(),
            points: 5,
            sign_in_opens_hours_before: 1,
            rsvp_enabled: true,
            questions: Vec::new(),
            attendance_code: Some(" qwerty ".to_string()),
        };
        let (_, code) = request.clone().into_parts()?;
        assert_eq!(code, "QWERTY");

        let generated = CreateEventRequest {
            attendance_code: None,
            ..request.clone()
        };
        let (_, code) = generated.into_parts()?;
        assert_eq!(code.len(), 6);

        let bad = CreateEventRequest {
            attendance_code: Some("abc".to_string()),
            ..request
        };
        assert!(bad.into_parts().is_err());
        Ok(())
    }

    #[test]
    fn code_hidden_from_members() {
        let member = Principal {
            user: user("Ada", "Lovelace"),
        };
        let mut admin_user = user("Grace", "Hopper");
        admin_user.is_admin = true;
        let admin = Principal { user: admin_user };

        let as_member = EventResponse::for_viewer(event(), &member, at(17, 30));
        assert_eq!(as_member.attendance_code, None);
        assert_eq!(as_member.window, WindowState::SignInOpen);

        let as_admin = EventResponse::for_viewer(event(), &admin, at(17, 30));
        assert_eq!(as_admin.attendance_code.as_deref(), Some("ABCDEF"));
    }
}
