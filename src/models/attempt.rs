// src/models/attempt.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

use crate::models::{question::PublicQuestion, result::ExamResult};

/// Represents the 'exam_attempts' table: a sitting that has started but
/// not yet been turned into a result.
#[derive(Debug, Clone, FromRow)]
pub struct ExamAttempt {
    pub id: i64,
    pub student_id: i64,
    pub exam_id: i64,

    /// Answers saved so far (question id -> option label).
    pub answers: Json<HashMap<i64, String>>,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// What a student sees while sitting an exam.
#[derive(Debug, Serialize)]
pub struct AttemptResponse {
    pub attempt_id: i64,
    pub exam_id: i64,
    pub title: String,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Seconds left on the countdown, never negative.
    pub remaining_seconds: i64,
    pub expired: bool,
    pub questions: Vec<PublicQuestion>,
    pub answers: HashMap<i64, String>,
}

/// DTO for saving one answer while the clock runs.
#[derive(Debug, Deserialize)]
pub struct SaveAnswerRequest {
    pub question_id: i64,
    pub answer: String,
}

/// DTO for submitting an attempt.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitExamRequest {
    /// Answers to merge over the saved ones.
    /// Key: Question ID, Value: selected option label.
    #[serde(default)]
    pub answers: HashMap<i64, String>,
}

/// Returned after a submission is graded.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub result: ExamResult,
    pub total_questions: usize,
    pub message: &'static str,
}
