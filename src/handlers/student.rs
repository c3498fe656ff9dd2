// src/handlers/student.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    handlers::auth::fetch_student_profile,
    models::{
        exam::{EXAM_SUMMARY_COLUMNS, ExamSummary},
        result::{ExamResult, RESULT_VIEW_SELECT, ResultView},
        user::StudentProfile,
    },
    services::timing::{self, WindowState},
    utils::jwt::Claims,
};

#[derive(Debug, Serialize)]
pub struct StudentDashboard {
    pub student: StudentProfile,
    pub available_exams: Vec<ExamSummary>,
    pub recent_results: Vec<ResultView>,
}

async fn require_profile(pool: &SqlitePool, student_id: i64) -> Result<StudentProfile, AppError> {
    fetch_student_profile(pool, student_id)
        .await?
        .ok_or(AppError::NotFound("Student profile not found.".to_string()))
}

/// Exams this student can take now: they have questions, the student has
/// no result for them yet, and their window (if any) is open.
async fn available_exams(pool: &SqlitePool, student_id: i64) -> Result<Vec<ExamSummary>, AppError> {
    let exams = sqlx::query_as::<_, ExamSummary>(&format!(
        r#"
        SELECT {EXAM_SUMMARY_COLUMNS}
        FROM exams e
        LEFT JOIN subjects s ON s.id = e.subject_id
        WHERE EXISTS (SELECT 1 FROM questions q WHERE q.exam_id = e.id)
          AND NOT EXISTS (SELECT 1 FROM results r WHERE r.exam_id = e.id AND r.student_id = ?)
        ORDER BY e.created_at DESC, e.id DESC
        "#
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    let now = Utc::now();
    Ok(exams
        .into_iter()
        .filter(|s| timing::window_state(s.exam.starts_at, s.exam.ends_at, now) == WindowState::Open)
        .collect())
}

async fn results_for(
    pool: &SqlitePool,
    student_id: i64,
    limit: Option<i64>,
) -> Result<Vec<ResultView>, AppError> {
    let results = sqlx::query_as::<_, ResultView>(&format!(
        "{RESULT_VIEW_SELECT} WHERE r.student_id = ? ORDER BY r.attempted_at DESC, r.id DESC LIMIT ?"
    ))
    .bind(student_id)
    // SQLite treats a negative LIMIT as "no limit".
    .bind(limit.unwrap_or(-1))
    .fetch_all(pool)
    .await?;

    Ok(results)
}

/// Student dashboard: profile, exams open to them and five latest results.
pub async fn dashboard(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;

    Ok(Json(StudentDashboard {
        student: require_profile(&pool, student_id).await?,
        available_exams: available_exams(&pool, student_id).await?,
        recent_results: results_for(&pool, student_id, Some(5)).await?,
    }))
}

pub async fn list_available_exams(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    Ok(Json(available_exams(&pool, student_id).await?))
}

/// Returns one of the caller's own results.
pub async fn get_result(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(result_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;

    let result = sqlx::query_as::<_, ExamResult>(
        r#"
        SELECT id, student_id, exam_id, score, marks_obtained, total_marks, percentage,
               status, answers, auto_submitted, attempted_at
        FROM results
        WHERE id = ?
        "#,
    )
    .bind(result_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Result not found".to_string()))?;

    if result.student_id != student_id {
        tracing::warn!(student_id, result_id, "Attempt to read another student's result");
        return Err(AppError::Forbidden("Access denied.".to_string()));
    }

    Ok(Json(result))
}

/// All of the caller's results, newest first.
pub async fn history(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    Ok(Json(results_for(&pool, student_id, None).await?))
}

pub async fn profile(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    Ok(Json(require_profile(&pool, student_id).await?))
}
