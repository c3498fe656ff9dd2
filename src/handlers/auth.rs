// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, MeResponse, RegisterRequest, Role, StudentProfile, User},
    utils::{
        hash::{hash_password, verify_dummy_password, verify_password},
        jwt::{Claims, sign_jwt},
    },
};

/// Shared by both failure paths so the response never reveals which part
/// of the credentials was wrong.
const INVALID_CREDENTIALS: &str = "Invalid email or password.";

pub async fn fetch_user(pool: &SqlitePool, id: i64) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, email, password, role, created_at FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn fetch_student_profile(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Option<StudentProfile>, AppError> {
    let profile = sqlx::query_as::<_, StudentProfile>(
        r#"
        SELECT user_id, name, roll_number, department, phone, created_at
        FROM students
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(profile)
}

/// Registers a new student.
///
/// Creates the user row and the student profile in one transaction.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(pool): State<SqlitePool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if payload.password != payload.confirm_password {
        return Err(AppError::BadRequest("Passwords do not match.".to_string()));
    }

    let email = payload.email.trim().to_lowercase();
    let roll_number = payload.roll_number.trim().to_string();
    let hashed_password = hash_password(&payload.password)?;
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, password, role, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING id, email, password, role, created_at
        "#,
    )
    .bind(&email)
    .bind(&hashed_password)
    .bind(Role::Student.as_str())
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        crate::error::conflict_or_internal(e, "Email already registered. Please login.")
    })?;

    let profile = sqlx::query_as::<_, StudentProfile>(
        r#"
        INSERT INTO students (user_id, name, roll_number, department, phone, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING user_id, name, roll_number, department, phone, created_at
        "#,
    )
    .bind(user.id)
    .bind(payload.name.trim())
    .bind(&roll_number)
    .bind(non_blank(payload.department.as_deref()))
    .bind(non_blank(payload.phone.as_deref()))
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| crate::error::conflict_or_internal(e, "Roll number already registered."))?;

    tx.commit().await?;

    tracing::info!(user_id = user.id, "Registered student {}", email);

    Ok((
        StatusCode::CREATED,
        Json(MeResponse {
            user,
            student: Some(profile),
        }),
    ))
}

/// Authenticates a user and returns a JWT token.
///
/// Verifies the email and password against the database.
/// If valid, signs a JWT token with the user's ID and role.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let email = payload.email.trim().to_lowercase();

    let user = sqlx::query_as::<_, User>(
        "SELECT id, email, password, role, created_at FROM users WHERE email = ?",
    )
    .bind(&email)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::from(e)
    })?;

    let Some(user) = user else {
        verify_dummy_password(&payload.password);
        tracing::warn!("Login failed for unknown email {}", email);
        return Err(AppError::AuthError(INVALID_CREDENTIALS.to_string()));
    };

    if !verify_password(&payload.password, &user.password)? {
        tracing::warn!(user_id = user.id, "Login failed: wrong password");
        return Err(AppError::AuthError(INVALID_CREDENTIALS.to_string()));
    }

    let token = sign_jwt(
        user.id,
        user.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    tracing::info!(user_id = user.id, role = %user.role, "User logged in");

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "role": user.role,
        "expires_in": config.jwt_expiration,
    })))
}

/// Revokes the presented token.
///
/// The token id is stored until the token would have expired anyway;
/// expired entries are pruned on every logout.
pub async fn logout(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let expires_at = DateTime::<Utc>::from_timestamp(claims.exp as i64, 0).unwrap_or_else(Utc::now);

    sqlx::query("INSERT OR IGNORE INTO revoked_tokens (jti, expires_at) VALUES (?, ?)")
        .bind(&claims.jti)
        .bind(expires_at)
        .execute(&pool)
        .await?;

    sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < ?")
        .bind(Utc::now() - chrono::Duration::minutes(5))
        .execute(&pool)
        .await?;

    tracing::info!(user = %claims.sub, "User logged out");

    Ok(StatusCode::NO_CONTENT)
}

/// Returns the authenticated user, with the student profile when present.
pub async fn me(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let user = fetch_user(&pool, user_id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let student = match user.role {
        Role::Student => fetch_student_profile(&pool, user.id).await?,
        Role::Admin => None,
    };

    Ok(Json(MeResponse { user, student }))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
