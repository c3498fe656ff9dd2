// src/models/exam.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::{error::AppError, models::not_blank};

/// Represents the 'exams' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Exam {
    pub id: i64,
    pub subject_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,

    /// Time allowed for one attempt, in minutes.
    pub duration_minutes: i64,

    /// Minimum marks needed for a 'pass' result.
    pub pass_marks: i64,

    /// Optional scheduled window. Attempts can only start inside it and
    /// never run past `ends_at`.
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,

    /// The admin who created the exam.
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// An exam together with aggregates used by both portals' listings.
#[derive(Debug, Serialize, FromRow)]
pub struct ExamSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub exam: Exam,
    pub subject_name: Option<String>,
    pub question_count: i64,
    pub total_marks: i64,
}

/// Column list shared by every query producing an `ExamSummary`.
/// Expects `exams e` joined with `subjects s`.
pub const EXAM_SUMMARY_COLUMNS: &str = r#"
    e.id, e.subject_id, e.title, e.description, e.duration_minutes, e.pass_marks,
    e.starts_at, e.ends_at, e.created_by, e.created_at,
    s.name AS subject_name,
    (SELECT COUNT(*) FROM questions q WHERE q.exam_id = e.id) AS question_count,
    (SELECT COALESCE(SUM(q.marks), 0) FROM questions q WHERE q.exam_id = e.id) AS total_marks
"#;

/// DTO for creating an exam.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    pub subject_id: Option<i64>,
    #[validate(
        length(min = 1, max = 200, message = "Exam title is required."),
        custom(function = not_blank)
    )]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 1440, message = "Duration must be 1-1440 minutes."))]
    pub duration_minutes: i64,
    #[validate(range(min = 0, message = "Pass marks cannot be negative."))]
    #[serde(default)]
    pub pass_marks: i64,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// DTO for updating an exam. Absent fields are left unchanged.
///
/// The window bounds distinguish an absent key (unchanged) from an explicit
/// `null`, which removes that bound.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateExamRequest {
    pub subject_id: Option<i64>,
    #[validate(length(min = 1, max = 200), custom(function = not_blank))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 1440))]
    pub duration_minutes: Option<i64>,
    #[validate(range(min = 0))]
    pub pass_marks: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub starts_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub ends_at: Option<Option<DateTime<Utc>>>,
}

/// Maps a present key to `Some(value)`, including `Some(None)` for `null`.
/// Absent keys fall back to `None` through `#[serde(default)]`.
fn deserialize_nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl UpdateExamRequest {
    pub fn is_empty(&self) -> bool {
        self.subject_id.is_none()
            && self.title.is_none()
            && self.description.is_none()
            && self.duration_minutes.is_none()
            && self.pass_marks.is_none()
            && self.starts_at.is_none()
            && self.ends_at.is_none()
    }
}

/// Rejects a window whose start is not strictly before its end.
pub fn validate_window(
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
) -> Result<(), AppError> {
    if let (Some(start), Some(end)) = (starts_at, ends_at) {
        if start >= end {
            return Err(AppError::BadRequest(
                "Exam start time must be before its end time.".to_string(),
            ));
        }
    }
    Ok(())
}
