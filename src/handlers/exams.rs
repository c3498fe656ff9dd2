// src/handlers/exams.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        exam::{
            CreateExamRequest, EXAM_SUMMARY_COLUMNS, Exam, ExamSummary, UpdateExamRequest,
            validate_window,
        },
        question::{
            CreateQuestionRequest, Question, UpdateQuestionRequest, label_index, normalize_label,
        },
    },
    utils::{html::clean_description, jwt::Claims},
};

const EXAM_COLUMNS: &str = "id, subject_id, title, description, duration_minutes, pass_marks, \
     starts_at, ends_at, created_by, created_at";

const QUESTION_COLUMNS: &str = "id, exam_id, prompt, options, correct_option, marks, created_at";

pub async fn fetch_exam(pool: &SqlitePool, id: i64) -> Result<Exam, AppError> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {EXAM_COLUMNS} FROM exams WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))
}

pub async fn fetch_exam_summary(pool: &SqlitePool, id: i64) -> Result<ExamSummary, AppError> {
    sqlx::query_as::<_, ExamSummary>(&format!(
        "SELECT {EXAM_SUMMARY_COLUMNS} FROM exams e LEFT JOIN subjects s ON s.id = e.subject_id WHERE e.id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Exam not found".to_string()))
}

/// All questions of an exam in creation order, answer keys included.
pub async fn fetch_questions(pool: &SqlitePool, exam_id: i64) -> Result<Vec<Question>, AppError> {
    let questions = sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE exam_id = ? ORDER BY id"
    ))
    .bind(exam_id)
    .fetch_all(pool)
    .await?;

    Ok(questions)
}

async fn ensure_subject_exists(pool: &SqlitePool, subject_id: Option<i64>) -> Result<(), AppError> {
    let Some(subject_id) = subject_id else {
        return Ok(());
    };

    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM subjects WHERE id = ?")
        .bind(subject_id)
        .fetch_optional(pool)
        .await?;

    match found {
        Some(_) => Ok(()),
        None => Err(AppError::BadRequest(format!("Subject {subject_id} does not exist."))),
    }
}

/// Checks the correct option label names one of the options.
fn check_correct_option(correct_option: &str, option_count: usize) -> Result<String, AppError> {
    label_index(correct_option, option_count)
        .map(|_| normalize_label(correct_option))
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "Correct answer must name one of the {option_count} options."
            ))
        })
}

/// Lists every exam with its question count and total marks.
pub async fn list_exams(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let exams = sqlx::query_as::<_, ExamSummary>(&format!(
        "SELECT {EXAM_SUMMARY_COLUMNS} FROM exams e LEFT JOIN subjects s ON s.id = e.subject_id \
         ORDER BY e.created_at DESC, e.id DESC"
    ))
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list exams: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(exams))
}

/// Creates an exam owned by the calling admin.
pub async fn create_exam(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    validate_window(payload.starts_at, payload.ends_at)?;
    ensure_subject_exists(&pool, payload.subject_id).await?;

    let admin_id = claims.user_id()?;

    let exam = sqlx::query_as::<_, Exam>(&format!(
        r#"
        INSERT INTO exams
        (subject_id, title, description, duration_minutes, pass_marks, starts_at, ends_at, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {EXAM_COLUMNS}
        "#
    ))
    .bind(payload.subject_id)
    .bind(payload.title.trim())
    .bind(clean_description(payload.description.as_deref()))
    .bind(payload.duration_minutes)
    .bind(payload.pass_marks)
    .bind(payload.starts_at)
    .bind(payload.ends_at)
    .bind(admin_id)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create exam: {:?}", e);
        AppError::from(e)
    })?;

    tracing::info!(exam_id = exam.id, admin = admin_id, "Created exam {:?}", exam.title);

    Ok((StatusCode::CREATED, Json(exam)))
}

#[derive(Debug, Serialize)]
pub struct ExamDetail {
    #[serde(flatten)]
    pub summary: ExamSummary,
    pub questions: Vec<Question>,
}

/// Returns an exam with all its questions, answer keys included.
pub async fn get_exam(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let summary = fetch_exam_summary(&pool, id).await?;
    let questions = fetch_questions(&pool, id).await?;

    Ok(Json(ExamDetail { summary, questions }))
}

/// Updates an exam by ID. The resulting window must stay ordered; an
/// explicit `null` bound removes it.
pub async fn update_exam(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let current = fetch_exam(&pool, id).await?;

    if payload.is_empty() {
        return Ok(StatusCode::OK);
    }

    validate_window(
        payload.starts_at.unwrap_or(current.starts_at),
        payload.ends_at.unwrap_or(current.ends_at),
    )?;
    ensure_subject_exists(&pool, payload.subject_id).await?;

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE exams SET ");
    let mut separated = builder.separated(", ");

    if let Some(subject_id) = payload.subject_id {
        separated.push("subject_id = ");
        separated.push_bind_unseparated(subject_id);
    }

    if let Some(title) = payload.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title.trim().to_string());
    }

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(clean_description(Some(description.as_str())));
    }

    if let Some(duration) = payload.duration_minutes {
        separated.push("duration_minutes = ");
        separated.push_bind_unseparated(duration);
    }

    if let Some(pass_marks) = payload.pass_marks {
        separated.push("pass_marks = ");
        separated.push_bind_unseparated(pass_marks);
    }

    if let Some(starts_at) = payload.starts_at {
        separated.push("starts_at = ");
        separated.push_bind_unseparated(starts_at);
    }

    if let Some(ends_at) = payload.ends_at {
        separated.push("ends_at = ");
        separated.push_bind_unseparated(ends_at);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update exam: {:?}", e);
        AppError::from(e)
    })?;

    Ok(StatusCode::OK)
}

/// Deletes an exam with its questions, attempts and results.
pub async fn delete_exam(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM exams WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete exam: {:?}", e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    tracing::info!(exam_id = id, "Deleted exam");

    Ok(StatusCode::NO_CONTENT)
}

/// Lists the questions of an exam, answer keys included.
pub async fn list_questions(
    State(pool): State<SqlitePool>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_exam(&pool, exam_id).await?;
    Ok(Json(fetch_questions(&pool, exam_id).await?))
}

/// Adds a question to an exam.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    Path(exam_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    fetch_exam(&pool, exam_id).await?;

    let correct_option = check_correct_option(&payload.correct_option, payload.options.len())?;
    let options: Vec<String> = payload.options.iter().map(|o| o.trim().to_string()).collect();

    let question = sqlx::query_as::<_, Question>(&format!(
        r#"
        INSERT INTO questions (exam_id, prompt, options, correct_option, marks, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING {QUESTION_COLUMNS}
        "#
    ))
    .bind(exam_id)
    .bind(payload.prompt.trim())
    .bind(SqlJson(&options))
    .bind(&correct_option)
    .bind(payload.marks.unwrap_or(1))
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::from(e)
    })?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Updates a question by ID.
///
/// The correct option is re-checked against the final option list, so
/// shrinking the options cannot leave a dangling answer key.
pub async fn update_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let current = sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Question not found".to_string()))?;

    if payload.is_empty() {
        return Ok(StatusCode::OK);
    }

    let option_count = payload
        .options
        .as_ref()
        .map_or(current.options.0.len(), Vec::len);
    let correct_option = check_correct_option(
        payload
            .correct_option
            .as_deref()
            .unwrap_or(current.correct_option.as_str()),
        option_count,
    )?;

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE questions SET ");
    let mut separated = builder.separated(", ");

    separated.push("correct_option = ");
    separated.push_bind_unseparated(correct_option);

    if let Some(prompt) = payload.prompt {
        separated.push("prompt = ");
        separated.push_bind_unseparated(prompt.trim().to_string());
    }

    if let Some(options) = payload.options {
        let options: Vec<String> = options.iter().map(|o| o.trim().to_string()).collect();
        separated.push("options = ");
        separated.push_bind_unseparated(SqlJson(options));
    }

    if let Some(marks) = payload.marks {
        separated.push("marks = ");
        separated.push_bind_unseparated(marks);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update question: {:?}", e);
        AppError::from(e)
    })?;

    Ok(StatusCode::OK)
}

/// Deletes a question by ID.
pub async fn delete_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
