// src/models/subject.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::not_blank;

/// Represents the 'subjects' table. Exams may be filed under a subject.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    /// Short unique code, e.g. "CS101".
    pub code: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubjectRequest {
    #[validate(
        length(min = 1, max = 100, message = "Subject name is required."),
        custom(function = not_blank)
    )]
    pub name: String,
    #[validate(
        length(min = 1, max = 20, message = "Subject code is required."),
        custom(function = not_blank)
    )]
    pub code: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSubjectRequest {
    #[validate(length(min = 1, max = 100), custom(function = not_blank))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 20), custom(function = not_blank))]
    pub code: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}
