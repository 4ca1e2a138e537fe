//! Error taxonomy shared by every operation

use sea_orm::{DbErr, SqlErr};
use serde::{Deserialize, Serialize};
use taskboard_policy::AccessDenied;
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

/// A single field-level validation message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing or invalid credential
    #[error("{0}")]
    Unauthenticated(String),

    /// Authenticated, but the policy denies the action
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    /// Duplicate membership, duplicate email, self-delete
    #[error("{0}")]
    Conflict(String),

    /// Storage or unexpected failure; the message is for logs only
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl ServiceError {
    pub fn not_found(what: &str) -> Self {
        ServiceError::NotFound(format!("{} not found", what))
    }

    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ServiceError::Validation(vec![FieldError::new(field, message)])
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Unauthenticated(_) => "UNAUTHORIZED",
            ServiceError::Forbidden(_) => "FORBIDDEN",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::Validation(_) => "VALIDATION_ERROR",
            ServiceError::Conflict(_) => "CONFLICT",
            ServiceError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_unique_violation(err: &DbErr) -> bool {
        matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
    }
}

impl From<DbErr> for ServiceError {
    fn from(err: DbErr) -> Self {
        if ServiceError::is_unique_violation(&err) {
            return ServiceError::Conflict("Resource already exists".to_string());
        }
        ServiceError::Internal(err.to_string())
    }
}

/// Field errors sorted by field name, with names in their wire (camelCase) form
impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = camel_case(&field);
                errs.iter().map(move |err| {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field));
                    FieldError::new(field.clone(), message)
                })
            })
            .collect();

        fields.sort_by(|a, b| a.field.cmp(&b.field));
        ServiceError::Validation(fields)
    }
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

impl From<AccessDenied> for ServiceError {
    fn from(denied: AccessDenied) -> Self {
        match denied {
            AccessDenied::Unauthenticated => ServiceError::Unauthenticated(denied.to_string()),
            AccessDenied::Forbidden(message) => ServiceError::Forbidden(message.to_string()),
        }
    }
}
