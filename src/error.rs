use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;
use tracing::error;

/// Request-level error taxonomy. Everything a handler can fail with maps
/// onto one of these; `ResponseError` turns them into JSON responses.
#[derive(Debug, Display)]
pub enum ApiError {
    /// Malformed or missing input.
    #[display(fmt = "{}", _0)]
    Validation(String),

    /// Duplicate office email, already punched in, etc.
    #[display(fmt = "{}", _0)]
    Conflict(String),

    /// Timesheet transition precondition unmet.
    #[display(fmt = "{}", _0)]
    InvalidState(String),

    #[display(fmt = "{}", _0)]
    Unauthorized(String),

    #[display(fmt = "{}", _0)]
    NotFound(String),

    /// Store or filesystem failure. Detail is logged, never leaked.
    #[display(fmt = "Something went wrong, Contact with system admin")]
    Internal,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) | ApiError::InvalidState(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "message": self.to_string()
        }))
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        error!(error = %e, "Database error");
        ApiError::Internal
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        error!(error = %e, "Filesystem error");
        ApiError::Internal
    }
}

/// SQLSTATE class 23 (integrity constraint violation), which MySQL reports
/// for duplicate keys. Used to turn unique-key losses into `Conflict`.
pub fn is_duplicate_key(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23000"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_400() {
        let e = ApiError::Validation("All required fields must be filled".into());
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_hides_detail() {
        let e: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!e.to_string().contains("row"));
    }

    #[test]
    fn unauthorized_and_not_found_codes() {
        assert_eq!(
            ApiError::Unauthorized("Missing token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::NotFound("Employee not found".into()).status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
