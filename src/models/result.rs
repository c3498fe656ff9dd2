// src/models/result.rs

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, types::Json};

/// Outcome of a graded attempt against the exam's pass marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Pass,
    Fail,
}

impl ResultStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ResultStatus::Pass => "pass",
            ResultStatus::Fail => "fail",
        }
    }
}

#[derive(Debug)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown result status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl TryFrom<String> for ResultStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pass" => Ok(ResultStatus::Pass),
            "fail" => Ok(ResultStatus::Fail),
            _ => Err(UnknownStatus(value)),
        }
    }
}

/// Represents the 'results' table: one row per completed attempt.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExamResult {
    pub id: i64,
    pub student_id: i64,
    pub exam_id: i64,

    /// Number of correctly answered questions.
    pub score: i64,
    pub marks_obtained: i64,
    pub total_marks: i64,
    pub percentage: f64,

    #[sqlx(try_from = "String")]
    pub status: ResultStatus,

    /// The answer set that was graded (question id -> option label).
    pub answers: Json<HashMap<i64, String>>,

    /// Set when the attempt was finalized after its deadline from saved
    /// answers.
    pub auto_submitted: bool,
    pub attempted_at: DateTime<Utc>,
}

/// A result row joined with its exam and student, for listings.
#[derive(Debug, Serialize, FromRow)]
pub struct ResultView {
    pub id: i64,
    pub exam_id: i64,
    pub exam_title: String,
    pub student_id: i64,
    pub student_name: Option<String>,
    pub roll_number: Option<String>,
    pub score: i64,
    pub marks_obtained: i64,
    pub total_marks: i64,
    pub percentage: f64,
    #[sqlx(try_from = "String")]
    pub status: ResultStatus,
    pub auto_submitted: bool,
    pub attempted_at: DateTime<Utc>,
}

/// SELECT prefix for `ResultView` queries; callers append WHERE/ORDER/LIMIT.
pub const RESULT_VIEW_SELECT: &str = r#"
    SELECT
        r.id, r.exam_id, e.title AS exam_title, r.student_id,
        st.name AS student_name, st.roll_number,
        r.score, r.marks_obtained, r.total_marks, r.percentage, r.status,
        r.auto_submitted, r.attempted_at
    FROM results r
    JOIN exams e ON e.id = r.exam_id
    LEFT JOIN students st ON st.user_id = r.student_id
"#;
