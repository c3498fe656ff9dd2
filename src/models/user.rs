// src/models/user.rs

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

static ROLL_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9/_-]{0,49}$").expect("valid regex"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 -]{5,14}$").expect("valid regex"));

/// Account role. Stored as lowercase text in `users.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Student => "student",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Student => "Student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}'", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "admin" => Ok(Role::Admin),
            "student" => Ok(Role::Student),
            _ => Err(UnknownRole(value)),
        }
    }
}

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,

    /// Unique login email.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    #[sqlx(try_from = "String")]
    pub role: Role,

    pub created_at: DateTime<Utc>,
}

/// Represents the 'students' table: the profile attached to a student user.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StudentProfile {
    pub user_id: i64,
    pub name: String,
    pub roll_number: String,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Row for the admin student listing (profile joined with its user).
#[derive(Debug, Serialize, FromRow)]
pub struct StudentSummary {
    pub user_id: i64,
    pub email: String,
    pub name: String,
    pub roll_number: String,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Current user, as returned by `/api/auth/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: User,
    pub student: Option<StudentProfile>,
}

/// DTO for student registration.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required."))]
    pub name: String,
    #[validate(email(message = "A valid email is required."), length(max = 120))]
    pub email: String,
    #[validate(length(
        min = 6,
        max = 128,
        message = "Password must be at least 6 characters long."
    ))]
    pub password: String,
    pub confirm_password: String,
    #[validate(custom(function = validate_roll_number))]
    pub roll_number: String,
    #[validate(length(max = 100))]
    pub department: Option<String>,
    #[validate(custom(function = validate_phone))]
    pub phone: Option<String>,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 120, message = "Please provide both email and password."))]
    pub email: String,
    #[validate(length(min = 1, max = 128, message = "Please provide both email and password."))]
    pub password: String,
}

fn validate_roll_number(roll_number: &str) -> Result<(), validator::ValidationError> {
    if !ROLL_NUMBER_RE.is_match(roll_number.trim()) {
        return Err(validator::ValidationError::new("invalid_roll_number")
            .with_message("Roll number must be 1-50 letters, digits, '/', '_' or '-'.".into()));
    }
    Ok(())
}

fn validate_phone(phone: &str) -> Result<(), validator::ValidationError> {
    if !phone.trim().is_empty() && !PHONE_RE.is_match(phone.trim()) {
        return Err(validator::ValidationError::new("invalid_phone")
            .with_message("Phone number is not valid.".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegisterRequest {
        RegisterRequest {
            name: "Asha".into(),
            email: "asha@example.com".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
            roll_number: "CS-2024/17".into(),
            department: Some("CS".into()),
            phone: Some("+91 98765 43210".into()),
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn short_password_is_rejected() {
        let mut req = request();
        req.password = "123".into();
        assert!(req.validate().is_err());
    }

    #[test]
    fn bad_email_and_roll_number_are_rejected() {
        let mut req = request();
        req.email = "not-an-email".into();
        assert!(req.validate().is_err());

        let mut req = request();
        req.roll_number = "has spaces".into();
        assert!(req.validate().is_err());
    }

    #[test]
    fn phone_is_optional_but_checked() {
        let mut req = request();
        req.phone = None;
        assert!(req.validate().is_ok());

        req.phone = Some("call me".into());
        assert!(req.validate().is_err());
    }

    #[test]
    fn role_parses_from_db_text() {
        assert_eq!(Role::try_from("admin".to_string()).unwrap(), Role::Admin);
        assert_eq!(Role::try_from("student".to_string()).unwrap(), Role::Student);
        assert!(Role::try_from("teacher".to_string()).is_err());
    }
}
