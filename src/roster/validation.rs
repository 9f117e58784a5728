//! Synchronous input checks run before any write.

use super::{
    models::{Answer, EventFields, Question, QuestionKind, Responses},
    window::MAX_OPENS_HOURS_BEFORE,
};

pub const BIO_MAX_WORDS: usize = 150;
pub const DESCRIPTION_MAX_WORDS: usize = 500;
pub const SHORT_ANSWER_MAX_WORDS: usize = 250;
pub const MAX_EVENT_POINTS: i64 = 1000;
pub const MAX_QUESTIONS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// # Errors
/// Returns an error when `value` is blank.
pub fn require(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new(field, "is required"))
    } else {
        Ok(())
    }
}

/// # Errors
/// Returns an error when `value` has more than `limit` words.
pub fn max_words(field: &str, value: &str, limit: usize) -> Result<(), ValidationError> {
    let count = word_count(value);
    if count > limit {
        Err(ValidationError::new(
            field,
            format!("must be at most {limit} words (got {count})"),
        ))
    } else {
        Ok(())
    }
}

/// # Errors
/// Returns the first problem found in the event fields.
pub fn validate_event(fields: &EventFields) -> Result<(), ValidationError> {
    require("name", &fields.name)?;
    require("location", &fields.location)?;
    require("committee", &fields.committee)?;
    max_words("description", &fields.description, DESCRIPTION_MAX_WORDS)?;

    if let Some(ends_at) = fields.ends_at {
        if ends_at <= fields.starts_at {
            return Err(ValidationError::new("ends_at", "must be after starts_at"));
        }
    }
    if !(0..=MAX_EVENT_POINTS).contains(&fields.points) {
        return Err(ValidationError::new(
            "points",
            format!("must be between 0 and {MAX_EVENT_POINTS}"),
        ));
    }
    if fields.sign_in_opens_hours_before > MAX_OPENS_HOURS_BEFORE {
        return Err(ValidationError::new(
            "sign_in_opens_hours_before",
            format!("must be between 0 and {MAX_OPENS_HOURS_BEFORE}"),
        ));
    }
    validate_questions(&fields.questions)
}

/// # Errors
/// Returns an error for blank prompts or option lists that do not fit the kind.
pub fn validate_questions(questions: &[Question]) -> Result<(), ValidationError> {
    if questions.len() > MAX_QUESTIONS {
        return Err(ValidationError::new(
            "questions",
            format!("at most {MAX_QUESTIONS} questions are allowed"),
        ));
    }
    for (index, question) in questions.iter().enumerate() {
        let field = format!("questions[{index}]");
        require(&field, &question.prompt)?;
        if question.kind.uses_options() {
            if question.options.is_empty() {
                return Err(ValidationError::new(field, "needs at least one option"));
            }
            if question.options.iter().any(|option| option.trim().is_empty()) {
                return Err(ValidationError::new(field, "options must not be blank"));
            }
        }
    }
    Ok(())
}

fn check_answer(field: &str, question: &Question, answer: &Answer) -> Result<(), ValidationError> {
    let in_options = |value: &String| question.options.iter().any(|option| option == value);
    match (question.kind, answer) {
        (QuestionKind::ShortAnswer, Answer::One(text)) => {
            max_words(field, text, SHORT_ANSWER_MAX_WORDS)
        }
        (QuestionKind::MultipleChoice | QuestionKind::Dropdown, Answer::One(choice)) => {
            if in_options(choice) {
                Ok(())
            } else {
                Err(ValidationError::new(field, "is not one of the options"))
            }
        }
        (QuestionKind::Checkboxes, Answer::Many(choices)) => {
            if choices.iter().all(in_options) {
                Ok(())
            } else {
                Err(ValidationError::new(field, "contains an unknown option"))
            }
        }
        (QuestionKind::TrueFalse, Answer::Flag(_)) => Ok(()),
        _ => Err(ValidationError::new(
            field,
            "does not match the question type",
        )),
    }
}

fn is_blank(answer: &Answer) -> bool {
    match answer {
        Answer::One(text) => text.trim().is_empty(),
        Answer::Many(values) => values.is_empty(),
        Answer::Flag(_) => false,
    }
}

/// Check answers against the event's questions and pad them to one per question.
///
/// # Errors
/// Returns an error for extra answers, wrong answer shapes, or missing required answers.
pub fn validate_responses(
    questions: &[Question],
    mut responses: Responses,
) -> Result<Responses, ValidationError> {
    if responses.len() > questions.len() {
        return Err(ValidationError::new(
            "responses",
            format!("expected at most {} answers", questions.len()),
        ));
    }
    responses.resize(questions.len(), None);

    for (index, (question, answer)) in questions.iter().zip(responses.iter()).enumerate() {
        let field = format!("responses[{index}]");
        match answer {
            Some(answer) if !is_blank(answer) => check_answer(&field, question, answer)?,
            _ if question.required => {
                return Err(ValidationError::new(field, "an answer is required"));
            }
            _ => {}
        }
    }
    Ok(responses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::models::fixtures::{at, fields};

    fn question(kind: QuestionKind, options: &[&str], required: bool) -> Question {
        Question {
            prompt: "Pick".to_string(),
            kind,
            options: options.iter().map(ToString::to_string).collect(),
            required,
        }
    }

    #[test]
    fn word_count_splits_on_whitespace() {
        assert_eq!(word_count("  one two\tthree\nfour "), 4);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn bio_limit_enforced() {
        let bio = "word ".repeat(BIO_MAX_WORDS + 1);
        assert!(max_words("bio", &bio, BIO_MAX_WORDS).is_err());
        assert!(max_words("bio", &"word ".repeat(BIO_MAX_WORDS), BIO_MAX_WORDS).is_ok());
    }

    #[test]
    fn event_requires_name_and_order() {
        let mut blank = fields();
        blank.name = "  ".to_string();
        assert_eq!(
            validate_event(&blank).map_err(|e| e.field),
            Err("name".to_string())
        );

        let mut backwards = fields();
        backwards.ends_at = Some(at(17, 0));
        assert_eq!(
            validate_event(&backwards).map_err(|e| e.field),
            Err("ends_at".to_string())
        );

        assert!(validate_event(&fields()).is_ok());
    }

    #[test]
    fn event_offset_and_points_bounds() {
        let mut offset = fields();
        offset.sign_in_opens_hours_before = MAX_OPENS_HOURS_BEFORE + 1;
        assert!(validate_event(&offset).is_err());

        let mut points = fields();
        points.points = -1;
        assert!(validate_event(&points).is_err());
    }

    #[test]
    fn choice_questions_need_options() {
        let questions = vec![question(QuestionKind::Dropdown, &[], false)];
        assert!(validate_questions(&questions).is_err());
        let questions = vec![question(QuestionKind::TrueFalse, &[], false)];
        assert!(validate_questions(&questions).is_ok());
    }

    #[test]
    fn responses_padded_and_checked() {
        let questions = vec![
            question(QuestionKind::MultipleChoice, &["Red", "Blue"], true),
            question(QuestionKind::ShortAnswer, &[], false),
        ];
        let padded = validate_responses(&questions, vec![Some(Answer::One("Red".to_string()))]);
        assert_eq!(
            padded,
            Ok(vec![Some(Answer::One("Red".to_string())), None])
        );

        let wrong = validate_responses(&questions, vec![Some(Answer::One("Green".to_string()))]);
        assert!(wrong.is_err());

        let missing = validate_responses(&questions, Vec::new());
        assert_eq!(
            missing.map_err(|e| e.field),
            Err("responses[0]".to_string())
        );
    }

    #[test]
    fn answer_shape_must_match_kind() {
        let questions = vec![
            question(QuestionKind::Checkboxes, &["A", "B"], false),
            question(QuestionKind::TrueFalse, &[], false),
        ];
        assert!(validate_responses(
            &questions,
            vec![
                Some(Answer::Many(vec!["A".to_string(), "B".to_string()])),
                Some(Answer::Flag(false)),
            ],
        )
        .is_ok());
        assert!(validate_responses(&questions, vec![Some(Answer::Flag(true))]).is_err());
        assert!(validate_responses(
            &questions,
            vec![None, None, Some(Answer::Flag(true))]
        )
        .is_err());
    }
}
