//! Maps service errors onto HTTP responses

use axum::{http::StatusCode, Json};
use taskboard_core::ServiceError;
use tracing::error;

use crate::models::ErrorResponse;

/// Handler result: the success body or a status with an [`ErrorResponse`]
pub type ApiResult<T> = Result<T, (StatusCode, Json<ErrorResponse>)>;

pub fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Validation(_) | ServiceError::Conflict(_) => StatusCode::BAD_REQUEST,
        ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Internal details are logged and replaced with a fixed message
pub fn error_response(err: ServiceError) -> (StatusCode, Json<ErrorResponse>) {
    let status = status_for(&err);
    let code = err.code();

    let body = match err {
        ServiceError::Internal(detail) => {
            error!(%detail, "Request failed with an internal error");
            ErrorResponse::new("Internal server error", code)
        }
        ServiceError::Validation(details) => {
            let message = ServiceError::Validation(details.clone()).to_string();
            ErrorResponse {
                details: Some(details),
                ..ErrorResponse::new(message, code)
            }
        }
        other => ErrorResponse::new(other.to_string(), code),
    };

    (status, Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskboard_core::FieldError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ServiceError::Unauthenticated("x".into()), StatusCode::UNAUTHORIZED),
            (ServiceError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ServiceError::Conflict("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::Validation(vec![]), StatusCode::BAD_REQUEST),
            (ServiceError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(status_for(&err), expected);
        }
    }

    #[test]
    fn test_internal_detail_is_hidden() {
        let (status, Json(body)) =
            error_response(ServiceError::Internal("no such table: users".into()));

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Internal server error");
        assert!(!body.success);
    }

    #[test]
    fn test_validation_carries_details() {
        let (_, Json(body)) = error_response(ServiceError::Validation(vec![FieldError::new(
            "name",
            "Project name is required",
        )]));

        assert_eq!(body.code.as_deref(), Some("VALIDATION_ERROR"));
        assert_eq!(body.details.unwrap()[0].field, "name");
    }
}
