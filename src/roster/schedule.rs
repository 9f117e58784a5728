//! Upcoming/past event listings.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

use super::models::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    #[default]
    Upcoming,
    Past,
    All,
}

fn matches_query(event: &Event, needle: &str) -> bool {
    [
        &event.fields.name,
        &event.fields.committee,
        &event.fields.location,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
}

/// Filter and order events for a listing.
///
/// Upcoming events (not yet ended) are soonest first; past events are most
/// recent first; `All` is ordered by start ascending.
#[must_use]
pub fn select(
    events: Vec<Event>,
    scope: Scope,
    query: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<Event> {
    let needle = query
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());

    let mut selected: Vec<Event> = events
        .into_iter()
        .filter(|event| match scope {
            Scope::Upcoming => event.ends_at() >= now,
            Scope::Past => event.ends_at() < now,
            Scope::All => true,
        })
        .filter(|event| needle.as_deref().map_or(true, |n| matches_query(event, n)))
        .collect();

    match scope {
        Scope::Upcoming | Scope::All => selected.sort_by_key(Event::starts_at),
        Scope::Past => selected.sort_by_key(|event| std::cmp::Reverse(event.starts_at())),
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::models::fixtures::{at, event};

    fn named(name: &str, start_hour: u32) -> Event {
        let mut event = event();
        event.fields.name = name.to_string();
        event.fields.starts_at = at(start_hour, 0);
        event.fields.ends_at = Some(at(start_hour + 1, 0));
        event
    }

    fn names(events: &[Event]) -> Vec<&str> {
        events.iter().map(|e| e.fields.name.as_str()).collect()
    }

    #[test]
    fn upcoming_includes_running_events() {
        let events = vec![named("Late", 20), named("Now", 12), named("Gone", 8)];
        let upcoming = select(events, Scope::Upcoming, None, at(12, 30));
        assert_eq!(names(&upcoming), vec!["Now", "Late"]);
    }

    #[test]
    fn past_is_most_recent_first() {
        let events = vec![named("First", 6), named("Second", 9), named("Future", 20)];
        let past = select(events, Scope::Past, None, at(12, 0));
        assert_eq!(names(&past), vec!["Second", "First"]);
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let mut social = named("Game Night", 20);
        social.fields.committee = "Social".to_string();
        let events = vec![named("Resume Workshop", 19), social];
        let found = select(events, Scope::All, Some("  SOCIAL "), at(0, 0));
        assert_eq!(names(&found), vec!["Game Night"]);
    }

    #[test]
    fn blank_query_filters_nothing() {
        let events = vec![named("A", 20), named("B", 21)];
        assert_eq!(select(events, Scope::All, Some("   "), at(0, 0)).len(), 2);
    }
}
