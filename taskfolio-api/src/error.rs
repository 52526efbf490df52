/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers should return `Result<T, ApiError>` which automatically
/// converts to appropriate HTTP status codes.
///
/// # Example
///
/// ```
/// use taskfolio_api::error::{ApiError, ApiResult};
/// use axum::Json;
///
/// async fn handler() -> ApiResult<Json<serde_json::Value>> {
///     Err(ApiError::NotFound("Task not found".to_string()))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400) - e.g., a malformed request body
    BadRequest(String),

    /// Bad request (400) - a date field failed to parse
    ///
    /// Carries the field and the offending input so the client can
    /// re-present the form.
    DateParse { field: &'static str, value: String },

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403) - resource exists but belongs to someone else
    AccessDenied(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409) - e.g., duplicate username or category name
    Conflict(String),

    /// Conflict (409) - category still referenced by tasks
    CategoryInUse { task_count: i64 },

    /// Unprocessable entity (422) - validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),

    /// Bad gateway (502) - an upstream service failed
    ExternalService(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// Builds a validation error for a single field
    pub fn validation(field: &str, message: &str) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: field.to_string(),
            message: message.to_string(),
        }])
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::DateParse { field, value } => {
                write!(f, "Invalid {} '{}': expected YYYY-MM-DD", field, value)
            }
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::AccessDenied(msg) => write!(f, "Access denied: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::CategoryInUse { task_count } => {
                write!(f, "Category is still used by {} task(s)", task_count)
            }
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ExternalService(msg) => write!(f, "External service error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "bad_request",
                msg,
                None,
            ),
            ApiError::DateParse { field, value } => (
                StatusCode::BAD_REQUEST,
                "date_parse_error",
                format!("Invalid {} '{}': expected YYYY-MM-DD", field, value),
                None,
            ),
            ApiError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                msg,
                None,
            ),
            ApiError::AccessDenied(msg) => (
                StatusCode::FORBIDDEN,
                "access_denied",
                msg,
                None,
            ),
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                "not_found",
                msg,
                None,
            ),
            ApiError::Conflict(msg) => (
                StatusCode::CONFLICT,
                "conflict",
                msg,
                None,
            ),
            ApiError::CategoryInUse { task_count } => (
                StatusCode::CONFLICT,
                "category_in_use",
                format!(
                    "Cannot delete category: {} task(s) still reference it",
                    task_count
                ),
                None,
            ),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg,
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => {
                ApiError::NotFound("Resource not found".to_string())
            }
            sqlx::Error::Database(db_err) => {
                // Check for unique constraint violations
                if let Some(constraint) = db_err.constraint() {
                    if constraint.contains("username") {
                        return ApiError::Conflict("Username already exists".to_string());
                    }
                    if constraint.contains("email") {
                        return ApiError::Conflict("Email already exists".to_string());
                    }
                    if constraint.contains("categories") {
                        return ApiError::Conflict("Category name already exists".to_string());
                    }
                    return ApiError::Conflict(format!("Constraint violation: {}", constraint));
                }

                // Other database errors are internal
                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert auth errors to API errors
impl From<taskfolio_shared::auth::middleware::AuthError> for ApiError {
    fn from(err: taskfolio_shared::auth::middleware::AuthError) -> Self {
        use taskfolio_shared::auth::middleware::AuthError;
        match err {
            AuthError::MissingCredentials => {
                ApiError::Unauthorized("Missing credentials".to_string())
            }
            AuthError::InvalidFormat(msg) => ApiError::Unauthorized(msg),
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(msg),
        }
    }
}

/// Convert token errors to API errors
impl From<taskfolio_shared::auth::token::TokenError> for ApiError {
    fn from(err: taskfolio_shared::auth::token::TokenError) -> Self {
        use taskfolio_shared::auth::token::TokenError;
        match err {
            TokenError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            TokenError::Invalid(msg) => ApiError::Unauthorized(format!("Invalid token: {}", msg)),
            TokenError::CreateError(msg) => {
                ApiError::InternalError(format!("Token creation failed: {}", msg))
            }
        }
    }
}

/// Convert password errors to API errors
impl From<taskfolio_shared::auth::password::PasswordError> for ApiError {
    fn from(err: taskfolio_shared::auth::password::PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert storage errors to API errors
impl From<taskfolio_shared::storage::StorageError> for ApiError {
    fn from(err: taskfolio_shared::storage::StorageError) -> Self {
        use taskfolio_shared::storage::StorageError;
        match err {
            StorageError::InvalidName => ApiError::NotFound("File not found".to_string()),
            StorageError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                ApiError::NotFound("File not found".to_string())
            }
            StorageError::Io(e) => ApiError::InternalError(format!("Storage error: {}", e)),
        }
    }
}

/// Convert Google Calendar errors to API errors
impl From<taskfolio_shared::calendar::google::GoogleError> for ApiError {
    fn from(err: taskfolio_shared::calendar::google::GoogleError) -> Self {
        use taskfolio_shared::calendar::google::GoogleError;
        match err {
            GoogleError::NotAuthenticated => {
                ApiError::Unauthorized("Google authentication required".to_string())
            }
            other => ApiError::ExternalService(other.to_string()),
        }
    }
}

/// Convert `validator` derive output to API errors
pub fn validation_errors(errors: validator::ValidationErrors) -> ApiError {
    let details = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| ValidationErrorDetail {
                field: field.to_string(),
                message: e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", field)),
            })
        })
        .collect();

    ApiError::ValidationError(details)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid date".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid date");

        let err = ApiError::NotFound("Task not found".to_string());
        assert_eq!(err.to_string(), "Not found: Task not found");
    }

    #[test]
    fn test_date_parse_display_echoes_input() {
        let err = ApiError::DateParse {
            field: "due_date",
            value: "10/03/2025".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid due_date '10/03/2025': expected YYYY-MM-DD"
        );
    }

    #[test]
    fn test_category_in_use_display() {
        let err = ApiError::CategoryInUse { task_count: 3 };
        assert_eq!(err.to_string(), "Category is still used by 3 task(s)");
    }

    #[test]
    fn test_validation_error() {
        let errors = vec![
            ValidationErrorDetail {
                field: "email".to_string(),
                message: "Invalid email format".to_string(),
            },
            ValidationErrorDetail {
                field: "password".to_string(),
                message: "Password too short".to_string(),
            },
        ];

        let err = ApiError::ValidationError(errors);
        assert_eq!(err.to_string(), "Validation failed: 2 errors");
    }

    #[test]
    fn test_not_authenticated_maps_to_unauthorized() {
        let err: ApiError = taskfolio_shared::calendar::google::GoogleError::NotAuthenticated.into();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
