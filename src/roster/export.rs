//! CSV roster export for an event.
//!
//! Rows cover every member who RSVP'd or signed in and still has an account,
//! grouped as RSVP'd-and-attended, attended-without-RSVP, then RSVP'd no-shows.
//! A trailer after a blank line summarizes each group.

use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

use super::models::{Event, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Group {
    RsvpAndAttended,
    AttendedOnly,
    RsvpNoShow,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RosterSummary {
    pub rsvp_and_attended: usize,
    pub attended_without_rsvp: usize,
    pub rsvp_no_show: usize,
}

impl RosterSummary {
    #[must_use]
    pub fn total_rsvped(&self) -> usize {
        self.rsvp_and_attended + self.rsvp_no_show
    }

    #[must_use]
    pub fn total_attended(&self) -> usize {
        self.rsvp_and_attended + self.attended_without_rsvp
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.rsvp_and_attended + self.attended_without_rsvp + self.rsvp_no_show
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterExport {
    pub csv: String,
    pub rows: usize,
    pub summary: RosterSummary,
}

/// Quote a value when it contains a comma; embedded quotes are doubled.
fn cell(value: &str) -> String {
    if value.contains(',') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

fn push_row<S: AsRef<str>>(out: &mut String, values: &[S]) {
    let line: Vec<String> = values.iter().map(|v| cell(v.as_ref())).collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

/// Build the CSV for `event`, resolving ids against `users`.
#[must_use]
pub fn build(event: &Event, users: &[User]) -> RosterExport {
    let by_id: HashMap<Uuid, &User> = users.iter().map(|user| (user.id, user)).collect();
    let attended: BTreeSet<Uuid> = event.attendees.iter().copied().collect();
    let rsvped: BTreeSet<Uuid> = event.rsvp_attendees.iter().copied().collect();

    let mut rows: Vec<(Group, &User)> = attended
        .union(&rsvped)
        .filter_map(|id| by_id.get(id).copied())
        .map(|user| {
            let group = match (rsvped.contains(&user.id), attended.contains(&user.id)) {
                (true, true) => Group::RsvpAndAttended,
                (false, _) => Group::AttendedOnly,
                (true, false) => Group::RsvpNoShow,
            };
            (group, user)
        })
        .collect();

    rows.sort_by(|(ga, a), (gb, b)| {
        ga.cmp(gb)
            .then_with(|| a.last_name.to_lowercase().cmp(&b.last_name.to_lowercase()))
            .then_with(|| a.first_name.to_lowercase().cmp(&b.first_name.to_lowercase()))
    });

    let mut csv = String::new();
    let mut header: Vec<String> = ["Email", "Name", "Major", "Year", "RSVP'd", "Attended"]
        .iter()
        .map(ToString::to_string)
        .collect();
    header.extend(event.fields.questions.iter().map(|q| q.prompt.clone()));
    push_row(&mut csv, &header);

    let mut summary = RosterSummary::default();
    for (group, user) in &rows {
        match group {
            Group::RsvpAndAttended => summary.rsvp_and_attended += 1,
            Group::AttendedOnly => summary.attended_without_rsvp += 1,
            Group::RsvpNoShow => summary.rsvp_no_show += 1,
        }

        let mut values = vec![
            user.email.clone(),
            user.full_name(),
            user.major.clone(),
            user.year.clone(),
            yes_no(rsvped.contains(&user.id)).to_string(),
            yes_no(attended.contains(&user.id)).to_string(),
        ];
        let responses = event.responses.get(&user.id);
        values.extend((0..event.fields.questions.len()).map(|index| {
            responses
                .and_then(|answers| answers.get(index))
                .and_then(Option::as_ref)
                .map(|answer| answer.display())
                .unwrap_or_default()
        }));
        push_row(&mut csv, &values);
    }

    csv.push('\n');
    let trailer = [
        ("RSVP'd and attended", summary.rsvp_and_attended),
        ("Attended without RSVP", summary.attended_without_rsvp),
        ("RSVP'd no-show", summary.rsvp_no_show),
        ("Total RSVP'd", summary.total_rsvped()),
        ("Total attended", summary.total_attended()),
        ("Total", summary.total()),
    ];
    for (label, count) in trailer {
        push_row(&mut csv, &[label.to_string(), count.to_string()]);
    }

    RosterExport {
        csv,
        rows: rows.len(),
        summary,
    }
}

/// Attachment name such as `general-meeting-roster.csv`.
#[must_use]
pub fn file_name(event_name: &str) -> String {
    let mut slug = String::new();
    for ch in event_name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "roster.csv".to_string()
    } else {
        format!("{slug}-roster.csv")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::models::fixtures::{event, user};
    use crate::roster::models::{Answer, Question, QuestionKind};

    fn lines(csv: &str) -> Vec<&str> {
        csv.lines().collect()
    }

    #[test]
    fn groups_in_order_and_counts_trailer() {
        let both = user("Bea", "Zed");
        let walk_in = user("Al", "Young");
        let no_show = user("Cal", "Able");
        let mut event = event();
        event.rsvp_attendees = vec![no_show.id, both.id];
        event.attendees = vec![both.id, walk_in.id];

        let export = build(&event, &[no_show.clone(), walk_in.clone(), both.clone()]);
        let rows = lines(&export.csv);
        assert_eq!(rows[0], "Email,Name,Major,Year,RSVP'd,Attended");
        assert!(rows[1].starts_with("bea@example.com,Bea Zed"));
        assert!(rows[1].ends_with("Yes,Yes"));
        assert!(rows[2].starts_with("al@example.com"));
        assert!(rows[2].ends_with("No,Yes"));
        assert!(rows[3].starts_with("cal@example.com"));
        assert!(rows[3].ends_with("Yes,No"));
        assert_eq!(rows[4], "");
        assert_eq!(
            &rows[5..],
            &[
                "RSVP'd and attended,1",
                "Attended without RSVP,1",
                "RSVP'd no-show,1",
                "Total RSVP'd,2",
                "Total attended,2",
                "Total,3",
            ]
        );
        assert_eq!(export.rows, 3);
    }

    #[test]
    fn row_count_is_deduplicated_union_of_known_users() {
        let a = user("Ann", "One");
        let b = user("Ben", "Two");
        let ghost = Uuid::new_v4();
        let mut event = event();
        event.rsvp_attendees = vec![a.id, b.id, ghost];
        event.attendees = vec![a.id, a.id, ghost];

        let export = build(&event, &[a, b]);
        assert_eq!(export.rows, 2);
        assert_eq!(export.summary.total(), 2);
    }

    #[test]
    fn values_with_commas_are_quoted() {
        let mut member = user("Dee", "Ruiz");
        member.major = "Math, Physics".to_string();
        let mut event = event();
        event.attendees = vec![member.id];
        event.fields.questions = vec![
            Question {
                prompt: "Dietary needs, if any".to_string(),
                kind: QuestionKind::ShortAnswer,
                options: Vec::new(),
                required: false,
            },
            Question {
                prompt: "Snacks".to_string(),
                kind: QuestionKind::Checkboxes,
                options: vec!["Chips".to_string(), "Fruit".to_string()],
                required: false,
            },
        ];
        event.responses.insert(
            member.id,
            vec![
                Some(Answer::One("Say \"no\", thanks".to_string())),
                Some(Answer::Many(vec!["Chips".to_string(), "Fruit".to_string()])),
            ],
        );

        let export = build(&event, &[member]);
        let rows = lines(&export.csv);
        assert_eq!(
            rows[0],
            "Email,Name,Major,Year,RSVP'd,Attended,\"Dietary needs, if any\",Snacks"
        );
        assert_eq!(
            rows[1],
            "dee@example.com,Dee Ruiz,\"Math, Physics\",Junior,No,Yes,\"Say \"\"no\"\", thanks\",Chips; Fruit"
        );
    }

    #[test]
    fn missing_responses_leave_blank_cells() {
        let member = user("Eve", "Stone");
        let mut event = event();
        event.rsvp_attendees = vec![member.id];
        event.fields.questions = vec![Question {
            prompt: "T-shirt size".to_string(),
            kind: QuestionKind::Dropdown,
            options: vec!["S".to_string(), "M".to_string()],
            required: false,
        }];
        let export = build(&event, &[member]);
        assert!(lines(&export.csv)[1].ends_with("Yes,No,"));
    }

    #[test]
    fn file_name_is_slugged() {
        assert_eq!(file_name("General Meeting #3"), "general-meeting-3-roster.csv");
        assert_eq!(file_name("!!!"), "roster.csv");
    }
}
