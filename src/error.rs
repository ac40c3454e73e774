/// Unified error handling for the gateway and the auth service.
///
/// Domain-specific error types are folded into a central `AppError`, which
/// maps every failure to an HTTP status and a small `{"error": "..."}` JSON
/// body. The wire message is always the generic, enumeration-safe text; the
/// detailed cause only reaches the logs.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// Validation errors for input data
#[derive(Debug, Clone)]
pub enum ValidationError {
    EmptyField(&'static str),
    TooShort(&'static str, usize),
    TooLong(&'static str, usize),
    InvalidFormat(&'static str),
    AlreadyInUse,
    InvalidBody(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is required", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
            ValidationError::AlreadyInUse => write!(f, "Email or username already used"),
            ValidationError::InvalidBody(msg) => write!(f, "Invalid request body: {}", msg),
        }
    }
}

impl StdError for ValidationError {}

/// Authentication and token errors.
///
/// Deliberately coarse: the caller never learns which check failed.
#[derive(Debug, Clone)]
pub enum AuthError {
    InvalidCredentials,
    MissingToken,
    InvalidToken,
    InvalidRefreshToken,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::MissingToken => write!(f, "No token"),
            AuthError::InvalidToken => write!(f, "Invalid token"),
            AuthError::InvalidRefreshToken => write!(f, "Invalid refresh token"),
        }
    }
}

impl StdError for AuthError {}

/// Gateway routing and forwarding errors
#[derive(Debug)]
pub enum GatewayError {
    RouteNotFound,
    Upstream(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::RouteNotFound => write!(f, "Not found"),
            GatewayError::Upstream(msg) => write!(f, "Upstream request failed: {}", msg),
        }
    }
}

impl StdError for GatewayError {}

/// Database operation errors
#[derive(Debug)]
pub enum DatabaseError {
    UniqueViolation(String),
    NotFound,
    Unavailable(String),
    Unexpected(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::UniqueViolation(msg) => write!(f, "Duplicate entry: {}", msg),
            DatabaseError::NotFound => write!(f, "Record not found"),
            DatabaseError::Unavailable(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::Unexpected(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

/// Central error type that all application errors map to
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Auth(AuthError),
    Gateway(GatewayError),
    Database(DatabaseError),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Gateway(e) => write!(f, "{}", e),
            AppError::Database(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        AppError::Gateway(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::Database(DatabaseError::NotFound),
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                AppError::Database(DatabaseError::UniqueViolation(db.to_string()))
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::Database(DatabaseError::Unavailable(err.to_string()))
            }
            _ => AppError::Database(DatabaseError::Unexpected(err.to_string())),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Gateway(GatewayError::Upstream(err.to_string()))
    }
}

/// Error response body. Every error the services emit has this shape.
#[derive(Debug, serde::Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl AppError {
    /// The message sent over the wire. Internal causes (addresses, SQL
    /// state, upstream errors) never appear here.
    fn public_message(&self) -> String {
        match self {
            AppError::Validation(e) => e.to_string(),
            AppError::Auth(e) => e.to_string(),
            AppError::Gateway(GatewayError::RouteNotFound) => "Not found".to_string(),
            AppError::Gateway(GatewayError::Upstream(_)) => "Internal Gateway Error".to_string(),
            AppError::Database(DatabaseError::UniqueViolation(_)) => "Duplicate entry".to_string(),
            AppError::Database(DatabaseError::NotFound) => "Not found".to_string(),
            AppError::Database(DatabaseError::Unavailable(_)) => {
                "Service temporarily unavailable".to_string()
            }
            AppError::Database(DatabaseError::Unexpected(_)) | AppError::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }

    fn log(&self) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(error = %e, "Validation error");
            }
            AppError::Auth(e) => {
                tracing::warn!(error = %e, "Authentication error");
            }
            AppError::Gateway(GatewayError::RouteNotFound) => {
                tracing::warn!("No route matched request path");
            }
            AppError::Gateway(e) => {
                tracing::error!(error = %e, "Gateway error");
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(e) => match e {
                // The login contract reports bad credentials as 400, not 401.
                AuthError::InvalidCredentials => StatusCode::BAD_REQUEST,
                _ => StatusCode::UNAUTHORIZED,
            },
            AppError::Gateway(e) => match e {
                GatewayError::RouteNotFound => StatusCode::NOT_FOUND,
                GatewayError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Database(e) => match e {
                DatabaseError::UniqueViolation(_) => StatusCode::CONFLICT,
                DatabaseError::NotFound => StatusCode::NOT_FOUND,
                DatabaseError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                DatabaseError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        self.log();
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.public_message(),
        })
    }
}

/// Request-scoped context for log correlation
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub operation: String,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            operation: operation.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_credentials_map_to_400() {
        let err = AppError::Auth(AuthError::InvalidCredentials);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "Invalid credentials");
    }

    #[test]
    fn token_errors_map_to_401() {
        assert_eq!(
            AppError::Auth(AuthError::MissingToken).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Auth(AuthError::InvalidToken).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Auth(AuthError::InvalidRefreshToken).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn unmatched_route_maps_to_404() {
        let err = AppError::Gateway(GatewayError::RouteNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.public_message(), "Not found");
    }

    #[test]
    fn upstream_failure_hides_backend_details() {
        let err = AppError::Gateway(GatewayError::Upstream(
            "connect error: 10.0.3.7:4002 refused".to_string(),
        ));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal Gateway Error");
    }

    #[test]
    fn duplicate_entry_maps_to_409() {
        let err = AppError::Database(DatabaseError::UniqueViolation("users_email_key".into()));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.public_message(), "Duplicate entry");
    }

    #[test]
    fn validation_error_messages_name_the_field() {
        let err = ValidationError::EmptyField("password");
        assert_eq!(err.to_string(), "password is required");

        let err = ValidationError::TooLong("username", 50);
        assert_eq!(err.to_string(), "username is too long (maximum 50 characters)");
    }
}
