use thiserror::Error;
use std::collections::HashMap;
use serde::{Serialize, Deserialize};

// Import Axum types for HTTP response conversion
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Structured validation errors with field-level error mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValidationErrors {
    Single { field: String, message: String },
    Multiple { fields: HashMap<String, String> },
}

impl ValidationErrors {
    /// Shorthand for a single-field validation failure.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        ValidationErrors::Single {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// First message, used as the envelope message for credential failures.
    fn summary(&self) -> String {
        match self {
            ValidationErrors::Single { message, .. } => message.clone(),
            ValidationErrors::Multiple { fields } => fields
                .values()
                .next()
                .cloned()
                .unwrap_or_else(|| "Invalid credentials".to_string()),
        }
    }

    fn into_fields(self) -> HashMap<String, String> {
        match self {
            ValidationErrors::Single { field, message } => HashMap::from([(field, message)]),
            ValidationErrors::Multiple { fields } => fields,
        }
    }
}

/// The custom error type for the application.
#[derive(Debug, Error)]
pub enum Error {
    /// An error originating from the sqlx library.
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A validation error with field-level details.
    #[error("Validation error: {0:?}")]
    Validation(ValidationErrors),

    /// A semantically invalid request (e.g. rating an unfinished service).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A not found error (resource does not exist).
    #[error("Not found: {0}")]
    NotFound(String),

    /// A forbidden error (user lacks permission).
    #[error("Access forbidden: {0}")]
    Forbidden(String),

    /// A conflict error (resource already exists or state changed underneath).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An authentication error (invalid credentials).
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Login rejected, pointing at the offending credential field.
    #[error("Invalid credentials: {0:?}")]
    InvalidCredentials(ValidationErrors),

    /// An invalid activation or password reset token.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Login attempted on an account that was never activated.
    #[error("Account inactive: {0}")]
    AccountInactive(String),

    /// Uploaded file exceeds the configured limit.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Client exceeded the request budget of the current window.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// A third-party service (image storage, mail API) failed.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// An internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// A type alias for `Result<T, Error>` to simplify function signatures.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Stable machine-readable code carried in the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::BadRequest(_) => "BAD_REQUEST",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Forbidden(_) => "FORBIDDEN",
            Error::Conflict(_) => "CONFLICT",
            Error::Authentication(_) | Error::InvalidCredentials(_) => "AUTHENTICATION_FAILED",
            Error::InvalidToken(_) => "INVALID_TOKEN",
            Error::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Error::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            Error::RateLimited(_) => "RATE_LIMITED",
            Error::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Error::Sqlx(_) | Error::Internal(_) | Error::Config(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Authentication(_) | Error::InvalidCredentials(_) => StatusCode::UNAUTHORIZED,
            Error::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            Error::AccountInactive(_) => StatusCode::FORBIDDEN,
            Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Error::ExternalService(_) => StatusCode::BAD_GATEWAY,
            Error::Sqlx(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Extractor rejections are reported through the same envelope as handler errors.
// Use with `axum_extra::extract::WithRejection<Json<T>, Error>`.

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::BadRequest(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::BadRequest(format!("Invalid query parameters: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::BadRequest(format!("Invalid path parameter: {}", rejection.body_text()))
    }
}

impl From<MultipartRejection> for Error {
    fn from(rejection: MultipartRejection) -> Self {
        Error::BadRequest(format!("Invalid multipart body: {}", rejection.body_text()))
    }
}

impl From<MultipartError> for Error {
    fn from(error: MultipartError) -> Self {
        if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Error::PayloadTooLarge("Uploaded file exceeds the size limit".to_string())
        } else {
            Error::BadRequest(format!("Invalid multipart body: {}", error.body_text()))
        }
    }
}

/// Convert custom Error to HTTP response
///
/// Every failure is rendered as `{"success": false, "error": {"code", "message", "fields"?}}`.
/// Database and configuration details are logged and replaced by a generic message.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let error = match self {
            Error::Validation(errors) => {
                serde_json::json!({
                    "code": code,
                    "message": "Validation failed",
                    "fields": errors.into_fields(),
                })
            }
            Error::InvalidCredentials(errors) => {
                serde_json::json!({
                    "code": code,
                    "message": errors.summary(),
                    "fields": errors.into_fields(),
                })
            }
            Error::Sqlx(e) => {
                tracing::error!(error = %e, "Database error while handling request");
                serde_json::json!({
                    "code": code,
                    "message": "Database error",
                })
            }
            Error::Config(e) => {
                tracing::error!(error = %e, "Configuration error while handling request");
                serde_json::json!({
                    "code": code,
                    "message": "Configuration error",
                })
            }
            Error::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error while handling request");
                serde_json::json!({
                    "code": code,
                    "message": msg,
                })
            }
            Error::BadRequest(msg)
            | Error::NotFound(msg)
            | Error::Forbidden(msg)
            | Error::Conflict(msg)
            | Error::Authentication(msg)
            | Error::InvalidToken(msg)
            | Error::AccountInactive(msg)
            | Error::PayloadTooLarge(msg)
            | Error::RateLimited(msg)
            | Error::ExternalService(msg) => {
                serde_json::json!({
                    "code": code,
                    "message": msg,
                })
            }
        };

        let body = serde_json::json!({
            "success": false,
            "error": error,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_error_renders_fields() {
        let response = Error::Validation(ValidationErrors::field("email", "Email is required"))
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["fields"]["email"], "Email is required");
    }

    #[tokio::test]
    async fn test_invalid_credentials_render_field_as_unauthorized() {
        let response = Error::InvalidCredentials(ValidationErrors::field(
            "password",
            "Incorrect password",
        ))
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "AUTHENTICATION_FAILED");
        assert_eq!(body["error"]["message"], "Incorrect password");
        assert_eq!(body["error"]["fields"]["password"], "Incorrect password");
    }

    #[tokio::test]
    async fn test_database_error_hides_details() {
        let response = Error::Sqlx(sqlx::Error::RowNotFound).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "Database error");
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(Error::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(Error::AccountInactive("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(Error::RateLimited("x".into()).status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(Error::ExternalService("x".into()).status(), StatusCode::BAD_GATEWAY);
    }
}
