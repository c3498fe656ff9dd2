// src/models/mod.rs

pub mod attempt;
pub mod exam;
pub mod pagination;
pub mod question;
pub mod result;
pub mod subject;
pub mod user;

/// Validator hook for required text: whitespace alone does not count.
pub fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank")
            .with_message("This field cannot be blank.".into()));
    }
    Ok(())
}
