//! Member, event and registration records shared by the domain rules and storage.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

use super::registration::RegistrationStatus;

/// Events without an explicit end run for this long.
pub const DEFAULT_EVENT_HOURS: i64 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub major: String,
    pub year: String,
    pub member_id: String,
    pub bio: String,
    pub points: i64,
    pub is_admin: bool,
    pub email_verified: bool,
    /// Events RSVP'd to and not yet attended.
    pub rsvp_events: Vec<Uuid>,
    pub attended_events: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    #[must_use]
    pub fn status_for(&self, event_id: Uuid) -> RegistrationStatus {
        if self.attended_events.contains(&event_id) {
            RegistrationStatus::SignedIn
        } else if self.rsvp_events.contains(&event_id) {
            RegistrationStatus::Rsvped
        } else {
            RegistrationStatus::Unregistered
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    ShortAnswer,
    MultipleChoice,
    Checkboxes,
    TrueFalse,
    Dropdown,
}

impl QuestionKind {
    /// Kinds whose answers must come from the question's option list.
    #[must_use]
    pub fn uses_options(self) -> bool {
        matches!(self, Self::MultipleChoice | Self::Checkboxes | Self::Dropdown)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Question {
    pub prompt: String,
    pub kind: QuestionKind,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub required: bool,
}

/// A single answer; which variant is valid depends on the question kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum Answer {
    Flag(bool),
    Many(Vec<String>),
    One(String),
}

impl Answer {
    /// Text used in exports.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Flag(true) => "True".to_string(),
            Self::Flag(false) => "False".to_string(),
            Self::Many(values) => values.join("; "),
            Self::One(value) => value.clone(),
        }
    }
}

/// Answers indexed by question position; `None` means skipped.
pub type Responses = Vec<Option<Answer>>;

/// Editable event fields, validated before any write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFields {
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub location: String,
    pub committee: String,
    pub description: String,
    pub points: i64,
    pub sign_in_opens_hours_before: u32,
    pub rsvp_enabled: bool,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: Uuid,
    pub fields: EventFields,
    pub attendance_code: String,
    pub photo_url: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    /// Members who signed in.
    pub attendees: Vec<Uuid>,
    /// Members who RSVP'd, including those who later signed in.
    pub rsvp_attendees: Vec<Uuid>,
    pub responses: BTreeMap<Uuid, Responses>,
}

impl Event {
    #[must_use]
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.fields.starts_at
    }

    /// End time, falling back to the default duration.
    #[must_use]
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.fields
            .ends_at
            .unwrap_or_else(|| self.fields.starts_at + Duration::hours(DEFAULT_EVENT_HOURS))
    }

    #[must_use]
    pub fn points(&self) -> i64 {
        self.fields.points
    }
}

/// Storage shape of one member's RSVP/attendance for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub rsvped_at: Option<DateTime<Utc>>,
    pub attended_at: Option<DateTime<Utc>>,
    pub responses: Responses,
}

impl Registration {
    #[must_use]
    pub fn status(&self) -> RegistrationStatus {
        if self.attended_at.is_some() {
            RegistrationStatus::SignedIn
        } else if self.rsvped_at.is_some() {
            RegistrationStatus::Rsvped
        } else {
            RegistrationStatus::Unregistered
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, hour, minute, 0)
            .single()
            .unwrap_or_default()
    }

    pub(crate) fn fields() -> EventFields {
        EventFields {
            name: "General Meeting".to_string(),
            starts_at: at(18, 0),
            ends_at: Some(at(19, 0)),
            location: "Room 101".to_string(),
            committee: "Outreach".to_string(),
            description: "Monthly meeting".to_string(),
            points: 5,
            sign_in_opens_hours_before: 1,
            rsvp_enabled: true,
            questions: Vec::new(),
        }
    }

    pub(crate) fn event() -> Event {
        Event {
            id: Uuid::new_v4(),
            fields: fields(),
            attendance_code: "ABCDEF".to_string(),
            photo_url: None,
            created_by: Uuid::new_v4(),
            created_at: at(9, 0),
            attendees: Vec::new(),
            rsvp_attendees: Vec::new(),
            responses: BTreeMap::new(),
        }
    }

    pub(crate) fn user(first: &str, last: &str) -> User {
        User {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", first.to_lowercase()),
            first_name: first.to_string(),
            last_name: last.to_string(),
            major: "Computer Science".to_string(),
            year: "Junior".to_string(),
            member_id: String::new(),
            bio: String::new(),
            points: 0,
            is_admin: false,
            email_verified: true,
            rsvp_events: Vec::new(),
            attended_events: Vec::new(),
            created_at: at(8, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn ends_at_defaults_to_two_hours() {
        let mut event = event();
        event.fields.ends_at = None;
        assert_eq!(event.ends_at(), at(20, 0));
    }

    #[test]
    fn status_for_prefers_attended() {
        let event = event();
        let mut user = user("Ada", "Lovelace");
        assert_eq!(user.status_for(event.id), RegistrationStatus::Unregistered);
        user.rsvp_events.push(event.id);
        assert_eq!(user.status_for(event.id), RegistrationStatus::Rsvped);
        user.rsvp_events.clear();
        user.attended_events.push(event.id);
        assert_eq!(user.status_for(event.id), RegistrationStatus::SignedIn);
    }

    #[test]
    fn answers_deserialize_by_shape() -> serde_json::Result<()> {
        let answers: Responses = serde_json::from_str(r#"[true, ["a", "b"], "text", null]"#)?;
        assert_eq!(
            answers,
            vec![
                Some(Answer::Flag(true)),
                Some(Answer::Many(vec!["a".to_string(), "b".to_string()])),
                Some(Answer::One("text".to_string())),
                None,
            ]
        );
        Ok(())
    }

    #[test]
    fn checkbox_answers_display_joined() {
        let answer = Answer::Many(vec!["Pizza".to_string(), "Tacos".to_string()]);
        assert_eq!(answer.display(), "Pizza; Tacos");
    }
}
