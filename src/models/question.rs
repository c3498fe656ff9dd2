// src/models/question.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::models::not_blank;

/// Fewest and most options a question may carry.
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 8;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Question {
    pub id: i64,
    pub exam_id: i64,

    /// The text of the question.
    pub prompt: String,

    /// Ordered list of choices. Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,

    /// Label of the correct choice: "A" for the first option, "B" for the
    /// second, and so on.
    pub correct_option: String,

    pub marks: i64,

    pub created_at: DateTime<Utc>,
}

/// DTO for sending question to students (excludes the correct option).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub prompt: String,
    pub options: Vec<String>,
    pub marks: i64,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            prompt: q.prompt,
            options: q.options.0,
            marks: q.marks,
        }
    }
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(
        length(min = 1, max = 2000, message = "Question text is required."),
        custom(function = not_blank)
    )]
    pub prompt: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(length(min = 1, max = 1))]
    pub correct_option: String,
    #[validate(range(min = 1, max = 100))]
    pub marks: Option<i64>,
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 2000), custom(function = not_blank))]
    pub prompt: Option<String>,
    #[validate(custom(function = validate_options))]
    pub options: Option<Vec<String>>,
    #[validate(length(min = 1, max = 1))]
    pub correct_option: Option<String>,
    #[validate(range(min = 1, max = 100))]
    pub marks: Option<i64>,
}

impl UpdateQuestionRequest {
    pub fn is_empty(&self) -> bool {
        self.prompt.is_none()
            && self.options.is_none()
            && self.correct_option.is_none()
            && self.marks.is_none()
    }
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() < MIN_OPTIONS || options.len() > MAX_OPTIONS {
        return Err(validator::ValidationError::new("option_count")
            .with_message(format!("A question needs {MIN_OPTIONS}-{MAX_OPTIONS} options.").into()));
    }
    for opt in options {
        if opt.trim().is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

/// Normalizes a submitted label: trims and upper-cases it.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_ascii_uppercase()
}

/// Zero-based option index for a label, if it names one of `option_count`
/// options.
pub fn label_index(label: &str, option_count: usize) -> Option<usize> {
    let normalized = normalize_label(label);
    let mut chars = normalized.chars();
    match (chars.next(), chars.next()) {
        (Some(c @ 'A'..='Z'), None) => {
            let index = (c as u8 - b'A') as usize;
            (index < option_count).then_some(index)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_follow_option_order() {
        assert_eq!(label_index("a", 4), Some(0));
        assert_eq!(label_index(" D ", 4), Some(3));
        assert_eq!(label_index("E", 4), None);
        assert_eq!(label_index("AB", 4), None);
        assert_eq!(label_index("", 4), None);
    }

    #[test]
    fn option_count_is_bounded() {
        let req = CreateQuestionRequest {
            prompt: "Pick one".into(),
            options: vec!["only".into()],
            correct_option: "A".into(),
            marks: None,
        };
        assert!(req.validate().is_err());

        let req = CreateQuestionRequest {
            options: vec!["yes".into(), " ".into()],
            ..req
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn public_question_hides_the_key() {
        let q = Question {
            id: 7,
            exam_id: 1,
            prompt: "2 + 2".into(),
            options: Json(vec!["3".into(), "4".into()]),
            correct_option: "B".into(),
            marks: 2,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(PublicQuestion::from(q)).unwrap();
        assert!(json.get("correct_option").is_none());
        assert_eq!(json["options"][1], "4");
    }
}
