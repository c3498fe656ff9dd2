// src/handlers/subjects.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::{
    error::{AppError, conflict_or_internal},
    models::subject::{CreateSubjectRequest, Subject, UpdateSubjectRequest},
    utils::html::clean_description,
};

/// Lists all subjects, newest first.
pub async fn list_subjects(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let subjects = sqlx::query_as::<_, Subject>(
        "SELECT id, name, code, description, created_at FROM subjects ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list subjects: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(subjects))
}

/// Creates a subject. The code must be unique.
pub async fn create_subject(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateSubjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let subject = sqlx::query_as::<_, Subject>(
        r#"
        INSERT INTO subjects (name, code, description, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING id, name, code, description, created_at
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.code.trim())
    .bind(clean_description(payload.description.as_deref()))
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| conflict_or_internal(e, "Subject code already exists."))?;

    tracing::info!(subject_id = subject.id, "Created subject {}", subject.code);

    Ok((StatusCode::CREATED, Json(subject)))
}

/// Updates a subject by ID.
pub async fn update_subject(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateSubjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if payload.name.is_none() && payload.code.is_none() && payload.description.is_none() {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM subjects WHERE id = ?")
            .bind(id)
            .fetch_optional(&pool)
            .await?;
        return match found {
            Some(_) => Ok(StatusCode::OK),
            None => Err(AppError::NotFound("Subject not found".to_string())),
        };
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE subjects SET ");
    let mut separated = builder.separated(", ");

    if let Some(name) = payload.name {
        separated.push("name = ");
        separated.push_bind_unseparated(name.trim().to_string());
    }

    if let Some(code) = payload.code {
        separated.push("code = ");
        separated.push_bind_unseparated(code.trim().to_string());
    }

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(clean_description(Some(description.as_str())));
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder
        .build()
        .execute(&pool)
        .await
        .map_err(|e| conflict_or_internal(e, "Subject code already exists."))?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Subject not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a subject and, through the foreign key, its exams.
pub async fn delete_subject(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM subjects WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete subject: {:?}", e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Subject not found".to_string()));
    }

    tracing::info!(subject_id = id, "Deleted subject");

    Ok(StatusCode::NO_CONTENT)
}
