// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    config::Config,
    error::AppError,
    models::{
        pagination::{ListParams, Page, offset},
        result::{RESULT_VIEW_SELECT, ResultView},
        user::StudentSummary,
    },
    utils::jwt::Claims,
};

const STUDENT_SUMMARY_SELECT: &str = r#"
    SELECT
        st.user_id, u.email, st.name, st.roll_number, st.department, st.phone, st.created_at
    FROM students st
    JOIN users u ON u.id = st.user_id
"#;

#[derive(Debug, Serialize)]
pub struct AdminDashboard {
    pub total_students: i64,
    pub total_subjects: i64,
    pub total_exams: i64,
    pub total_results: i64,
    pub recent_students: Vec<StudentSummary>,
    pub recent_results: Vec<ResultView>,
}

async fn count(pool: &SqlitePool, table: &'static str) -> Result<i64, AppError> {
    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await?;
    Ok(total)
}

/// Admin dashboard: totals plus the five newest students and results.
pub async fn dashboard(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let recent_students = sqlx::query_as::<_, StudentSummary>(&format!(
        "{STUDENT_SUMMARY_SELECT} ORDER BY st.created_at DESC, st.id DESC LIMIT 5"
    ))
    .fetch_all(&pool)
    .await?;

    let recent_results = sqlx::query_as::<_, ResultView>(&format!(
        "{RESULT_VIEW_SELECT} ORDER BY r.attempted_at DESC, r.id DESC LIMIT 5"
    ))
    .fetch_all(&pool)
    .await?;

    Ok(Json(AdminDashboard {
        total_students: count(&pool, "students").await?,
        total_subjects: count(&pool, "subjects").await?,
        total_exams: count(&pool, "exams").await?,
        total_results: count(&pool, "results").await?,
        recent_students,
        recent_results,
    }))
}

/// Lists students, newest first.
///
/// `search` matches name, roll number or department as a substring.
pub async fn list_students(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.page();
    let per_page = config.students_per_page;
    let pattern = params.search().map(|s| format!("%{s}%"));

    let filter = if pattern.is_some() {
        " WHERE st.name LIKE ?1 OR st.roll_number LIKE ?1 OR st.department LIKE ?1"
    } else {
        ""
    };

    let count_sql = format!("SELECT COUNT(*) FROM students st{filter}");
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(p) = &pattern {
        count_query = count_query.bind(p);
    }
    let total = count_query.fetch_one(&pool).await?;

    let list_sql = if pattern.is_some() {
        format!("{STUDENT_SUMMARY_SELECT}{filter} ORDER BY st.created_at DESC, st.id DESC LIMIT ?2 OFFSET ?3")
    } else {
        format!("{STUDENT_SUMMARY_SELECT} ORDER BY st.created_at DESC, st.id DESC LIMIT ?1 OFFSET ?2")
    };

    let mut list_query = sqlx::query_as::<_, StudentSummary>(&list_sql);
    if let Some(p) = &pattern {
        list_query = list_query.bind(p);
    }
    let students = list_query
        .bind(per_page)
        .bind(offset(page, per_page))
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list students: {:?}", e);
            AppError::from(e)
        })?;

    Ok(Json(Page::new(students, page, per_page, total)))
}

/// Deletes a student (by user id) together with their profile, attempts
/// and results.
pub async fn delete_student(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM users WHERE id = ? AND role = 'student'")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete student: {:?}", e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Student not found".to_string()));
    }

    tracing::info!(admin = %claims.sub, student_id = id, "Deleted student");

    Ok(StatusCode::NO_CONTENT)
}

/// Lists all results, newest first.
pub async fn list_results(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.page();
    let per_page = config.results_per_page;

    let total = count(&pool, "results").await?;

    let results = sqlx::query_as::<_, ResultView>(&format!(
        "{RESULT_VIEW_SELECT} ORDER BY r.attempted_at DESC, r.id DESC LIMIT ? OFFSET ?"
    ))
    .bind(per_page)
    .bind(offset(page, per_page))
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list results: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(Page::new(results, page, per_page, total)))
}

/// Lists every result of one exam, best marks first.
pub async fn list_exam_results(
    State(pool): State<SqlitePool>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM exams WHERE id = ?")
        .bind(exam_id)
        .fetch_optional(&pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    let results = sqlx::query_as::<_, ResultView>(&format!(
        "{RESULT_VIEW_SELECT} WHERE r.exam_id = ? ORDER BY r.marks_obtained DESC, r.attempted_at ASC"
    ))
    .bind(exam_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(results))
}

/// Deletes a result. The student may then attempt the exam again.
pub async fn delete_result(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM results WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete result: {:?}", e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Result not found".to_string()));
    }

    tracing::info!(admin = %claims.sub, result_id = id, "Deleted result");

    Ok(StatusCode::NO_CONTENT)
}
