// src/handlers/attempt.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{SqlitePool, types::Json as SqlJson};

use crate::{
    config::Config,
    error::{AppError, is_unique_violation},
    handlers::exams::{fetch_exam, fetch_questions},
    models::{
        attempt::{AttemptResponse, ExamAttempt, SaveAnswerRequest, SubmitExamRequest, SubmitResponse},
        exam::Exam,
        question::{PublicQuestion, label_index, normalize_label},
        result::ExamResult,
    },
    services::{
        grading::{AnswerKey, grade},
        timing::{self, WindowState},
    },
    utils::jwt::Claims,
};

const ALREADY_ATTEMPTED: &str = "You have already attempted this exam.";

async fn fetch_attempt(
    pool: &SqlitePool,
    student_id: i64,
    exam_id: i64,
) -> Result<Option<ExamAttempt>, AppError> {
    let attempt = sqlx::query_as::<_, ExamAttempt>(
        r#"
        SELECT id, student_id, exam_id, answers, started_at, expires_at
        FROM exam_attempts
        WHERE student_id = ? AND exam_id = ?
        "#,
    )
    .bind(student_id)
    .bind(exam_id)
    .fetch_optional(pool)
    .await?;

    Ok(attempt)
}

async fn has_result(pool: &SqlitePool, student_id: i64, exam_id: i64) -> Result<bool, AppError> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT id FROM results WHERE student_id = ? AND exam_id = ?")
            .bind(student_id)
            .bind(exam_id)
            .fetch_optional(pool)
            .await?;

    Ok(found.is_some())
}

async fn attempt_response(
    pool: &SqlitePool,
    exam: &Exam,
    attempt: ExamAttempt,
    now: DateTime<Utc>,
) -> Result<AttemptResponse, AppError> {
    let questions = fetch_questions(pool, exam.id)
        .await?
        .into_iter()
        .map(PublicQuestion::from)
        .collect();

    Ok(AttemptResponse {
        attempt_id: attempt.id,
        exam_id: exam.id,
        title: exam.title.clone(),
        started_at: attempt.started_at,
        expires_at: attempt.expires_at,
        remaining_seconds: timing::remaining_seconds(attempt.expires_at, now),
        expired: !timing::is_open(attempt.expires_at, now),
        questions,
        answers: attempt.answers.0,
    })
}

/// Grades `answers` and turns the attempt into a result.
///
/// The result insert and the attempt delete share one transaction; the
/// UNIQUE(student_id, exam_id) constraint turns a concurrent duplicate into
/// a 409.
async fn finalize_attempt(
    pool: &SqlitePool,
    exam: &Exam,
    attempt: &ExamAttempt,
    answers: &HashMap<i64, String>,
    auto_submitted: bool,
) -> Result<(ExamResult, usize), AppError> {
    let key = sqlx::query_as::<_, AnswerKey>(
        "SELECT id AS question_id, correct_option, marks FROM questions WHERE exam_id = ?",
    )
    .bind(exam.id)
    .fetch_all(pool)
    .await?;

    // Only keep answers to this exam's questions, in canonical form.
    let graded_answers: HashMap<i64, String> = key
        .iter()
        .filter_map(|k| {
            answers
                .get(&k.question_id)
                .map(|a| (k.question_id, normalize_label(a)))
        })
        .collect();

    let outcome = grade(&key, &graded_answers, exam.pass_marks);

    let mut tx = pool.begin().await?;

    let result = sqlx::query_as::<_, ExamResult>(
        r#"
        INSERT INTO results
        (student_id, exam_id, score, marks_obtained, total_marks, percentage, status, answers, auto_submitted, attempted_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id, student_id, exam_id, score, marks_obtained, total_marks, percentage,
                  status, answers, auto_submitted, attempted_at
        "#,
    )
    .bind(attempt.student_id)
    .bind(exam.id)
    .bind(outcome.score)
    .bind(outcome.marks_obtained)
    .bind(outcome.total_marks)
    .bind(outcome.percentage)
    .bind(outcome.status.as_str())
    .bind(SqlJson(&graded_answers))
    .bind(auto_submitted)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(ALREADY_ATTEMPTED.to_string())
        } else {
            tracing::error!("Failed to insert result: {:?}", e);
            AppError::from(e)
        }
    })?;

    sqlx::query("DELETE FROM exam_attempts WHERE id = ?")
        .bind(attempt.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(
        student_id = attempt.student_id,
        exam_id = exam.id,
        score = outcome.score,
        marks = outcome.marks_obtained,
        auto_submitted,
        "Exam submitted"
    );

    Ok((result, outcome.total_questions))
}

/// Starts (or resumes) an attempt.
///
/// * 409 if the student already has a result for this exam.
/// * 400 if the exam has no questions or is outside its window.
/// * An attempt left past its deadline is finalized from saved answers and
///   reported as 409.
pub async fn start_exam(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let exam = fetch_exam(&pool, exam_id).await?;
    let now = Utc::now();

    if has_result(&pool, student_id, exam_id).await? {
        return Err(AppError::Conflict(ALREADY_ATTEMPTED.to_string()));
    }

    if let Some(attempt) = fetch_attempt(&pool, student_id, exam_id).await? {
        if timing::accepts_submission(attempt.expires_at, now, config.exam_grace_seconds) {
            let body = attempt_response(&pool, &exam, attempt, now).await?;
            return Ok((StatusCode::OK, Json(body)));
        }

        let saved = attempt.answers.0.clone();
        finalize_attempt(&pool, &exam, &attempt, &saved, true).await?;
        return Err(AppError::Conflict(
            "Exam time has expired. Your saved answers were submitted.".to_string(),
        ));
    }

    let question_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE exam_id = ?")
        .bind(exam_id)
        .fetch_one(&pool)
        .await?;
    if question_count == 0 {
        return Err(AppError::BadRequest("This exam has no questions yet.".to_string()));
    }

    match timing::window_state(exam.starts_at, exam.ends_at, now) {
        WindowState::Open => {}
        WindowState::NotOpen => {
            return Err(AppError::BadRequest("This exam has not opened yet.".to_string()));
        }
        WindowState::Closed => {
            return Err(AppError::BadRequest("This exam has closed.".to_string()));
        }
    }

    let expires_at = timing::compute_expiration(now, exam.duration_minutes, exam.ends_at);

    // A concurrent start may have won the race; both then read the same row.
    sqlx::query(
        r#"
        INSERT INTO exam_attempts (student_id, exam_id, answers, started_at, expires_at)
        VALUES (?, ?, '{}', ?, ?)
        ON CONFLICT (student_id, exam_id) DO NOTHING
        "#,
    )
    .bind(student_id)
    .bind(exam_id)
    .bind(now)
    .bind(expires_at)
    .execute(&pool)
    .await?;

    let attempt = fetch_attempt(&pool, student_id, exam_id)
        .await?
        .ok_or(AppError::InternalServerError("Attempt vanished after insert".to_string()))?;

    tracing::info!(student_id, exam_id, %expires_at, "Exam started");

    let body = attempt_response(&pool, &exam, attempt, now).await?;
    Ok((StatusCode::CREATED, Json(body)))
}

/// Returns the attempt in progress: questions without keys, saved answers
/// and the countdown.
pub async fn get_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let exam = fetch_exam(&pool, exam_id).await?;

    let attempt = fetch_attempt(&pool, student_id, exam_id)
        .await?
        .ok_or(AppError::NotFound("No exam in progress.".to_string()))?;

    Ok(Json(attempt_response(&pool, &exam, attempt, Utc::now()).await?))
}

/// Saves one answer. Rejected once the countdown reaches zero.
pub async fn save_answer(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
    Json(payload): Json<SaveAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let now = Utc::now();

    let attempt = fetch_attempt(&pool, student_id, exam_id)
        .await?
        .ok_or(AppError::BadRequest("Invalid exam session.".to_string()))?;

    if !timing::is_open(attempt.expires_at, now) {
        return Err(AppError::BadRequest("Exam time is over.".to_string()));
    }

    let options: Option<SqlJson<Vec<String>>> =
        sqlx::query_scalar("SELECT options FROM questions WHERE id = ? AND exam_id = ?")
            .bind(payload.question_id)
            .bind(exam_id)
            .fetch_optional(&pool)
            .await?;

    let options = options.ok_or(AppError::BadRequest(
        "Question does not belong to this exam.".to_string(),
    ))?;

    if label_index(&payload.answer, options.0.len()).is_none() {
        return Err(AppError::BadRequest("Invalid answer".to_string()));
    }

    let answer = normalize_label(&payload.answer);
    let path = format!("$.\"{}\"", payload.question_id);

    sqlx::query("UPDATE exam_attempts SET answers = json_set(answers, ?, ?) WHERE id = ?")
        .bind(&path)
        .bind(&answer)
        .bind(attempt.id)
        .execute(&pool)
        .await?;

    Ok(Json(json!({
        "success": true,
        "question_id": payload.question_id,
        "answer": answer,
        "remaining_seconds": timing::remaining_seconds(attempt.expires_at, now),
    })))
}

/// Submits the attempt and scores it.
///
/// On time (deadline plus grace): the request's answers are merged over
/// the saved ones. Late: the saved answers are graded as they stand and
/// the result is flagged `auto_submitted`.
pub async fn submit_exam(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
    Json(payload): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let exam = fetch_exam(&pool, exam_id).await?;

    let Some(attempt) = fetch_attempt(&pool, student_id, exam_id).await? else {
        if has_result(&pool, student_id, exam_id).await? {
            return Err(AppError::Conflict(ALREADY_ATTEMPTED.to_string()));
        }
        return Err(AppError::BadRequest(
            "No exam in progress. Start the exam first.".to_string(),
        ));
    };

    let on_time =
        timing::accepts_submission(attempt.expires_at, Utc::now(), config.exam_grace_seconds);

    let mut answers = attempt.answers.0.clone();
    if on_time {
        answers.extend(payload.answers);
    } else {
        tracing::warn!(student_id, exam_id, "Late submission, grading saved answers");
    }

    let (result, total_questions) =
        finalize_attempt(&pool, &exam, &attempt, &answers, !on_time).await?;

    let message = if on_time {
        "Exam submitted successfully!"
    } else {
        "Time was up. Your saved answers were submitted."
    };

    Ok(Json(SubmitResponse {
        result,
        total_questions,
        message,
    }))
}
