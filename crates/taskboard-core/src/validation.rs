//! Custom field rules for `#[derive(Validate)]` request shapes
//!
//! Plain length, email and range limits are declared on the structs themselves. The
//! functions here cover the rules `validator` has no attribute for: lengths measured
//! after trimming, and password strength.

use std::borrow::Cow;

use taskboard_auth::check_password_strength;
use validator::ValidationError;

/// Trimmed length must fall in `min..=max`
fn trimmed_length(value: &str, label: &str, min: usize, max: usize) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    let message = if len == 0 && min > 0 {
        format!("{} is required", label)
    } else if len < min || len > max {
        format!("{} must be between {} and {} characters", label, min, max)
    } else {
        return Ok(());
    };

    let mut err = ValidationError::new("length");
    err.message = Some(Cow::Owned(message));
    Err(err)
}

pub fn project_name(value: &str) -> Result<(), ValidationError> {
    trimmed_length(value, "Project name", 3, 100)
}

pub fn project_description(value: &str) -> Result<(), ValidationError> {
    trimmed_length(value, "Description", 1, 500)
}

pub fn task_title(value: &str) -> Result<(), ValidationError> {
    trimmed_length(value, "Task title", 3, 200)
}

pub fn comment_text(value: &str) -> Result<(), ValidationError> {
    trimmed_length(value, "Comment text", 1, 1000)
}

pub fn person_name(value: &str) -> Result<(), ValidationError> {
    trimmed_length(value, "Name", 2, 50)
}

/// At least six characters and one digit
pub fn password_strength(value: &str) -> Result<(), ValidationError> {
    check_password_strength(value).map_err(|e| {
        let mut err = ValidationError::new("password_strength");
        err.message = Some(Cow::Owned(e.to_string()));
        err
    })
}

/// Emails are stored lower-cased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(result: Result<(), ValidationError>) -> String {
        result
            .unwrap_err()
            .message
            .map(|m| m.to_string())
            .unwrap_or_default()
    }

    #[test]
    fn test_length_reports_required_then_range() {
        assert_eq!(message(project_name("   ")), "Project name is required");
        assert_eq!(
            message(task_title("ab")),
            "Task title must be between 3 and 200 characters"
        );
        assert!(task_title("  abc  ").is_ok());
    }

    #[test]
    fn test_length_counts_characters_after_trimming() {
        assert!(person_name(" é ").is_err());
        assert!(person_name("Zoë").is_ok());
        assert!(comment_text(&"x".repeat(1000)).is_ok());
        assert!(comment_text(&"x".repeat(1001)).is_err());
    }

    #[test]
    fn test_password_needs_a_digit() {
        assert!(password_strength("abcdef").is_err());
        assert!(password_strength("abcde1").is_ok());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
