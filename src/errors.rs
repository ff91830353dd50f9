use actix_web::{error::ResponseError, http::StatusCode, HttpResponse, HttpResponseBuilder};
use serde::Serialize;
use thiserror::Error;

use posse_config::ConfigError;
use posse_models::DatabaseError;
use posse_services::ServiceError;
use posse_validators::ValidationError;

/// Errors surfaced by the HTTP layer, mapped to the status codes and
/// sanitized bodies described for the webhook/webmention/reply endpoints.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("{0}")]
    ValidationError(String),

    #[error("auth error: {0}")]
    AuthError(&'static str),

    #[error("referrer not allowed")]
    ForbiddenReferrer,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("{0} not found")]
    NotFoundError(&'static str),

    #[error("feature not configured: {0}")]
    NotConfigured(&'static str),

    #[error("database error: {0}")]
    DatabaseError(#[source] DatabaseError),

    #[error("upstream service error: {0}")]
    ServiceError(#[source] ServiceError),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl HttpError {
    /// Sanitizes the error for the response body, collapsing anything
    /// that could leak credentials, tokens, or internal network details.
    fn error_message(&self) -> String {
        let rendered = self.to_string();
        let lower = rendered.to_lowercase();
        const SENSITIVE_MARKERS: &[&str] = &[
            "token",
            "credential",
            "timeout",
            "connection refused",
            "too many",
        ];
        if SENSITIVE_MARKERS.iter().any(|marker| lower.contains(marker)) {
            return "an internal error occurred".to_owned();
        }
        match self {
            HttpError::DatabaseError(_) => "database error".to_owned(),
            HttpError::ServiceError(_) => "upstream service error".to_owned(),
            HttpError::InternalError(_) => "internal error".to_owned(),
            other => other.to_string(),
        }
    }
}

impl From<DatabaseError> for HttpError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::NotFound(name) => Self::NotFoundError(name),
            other => Self::DatabaseError(other),
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        Self::ServiceError(error)
    }
}

impl From<ValidationError> for HttpError {
    fn from(error: ValidationError) -> Self {
        Self::ValidationError(format!("{}: {}", error.path, error.reason))
    }
}

impl From<ConfigError> for HttpError {
    fn from(error: ConfigError) -> Self {
        Self::InternalError(error.to_string())
    }
}

/// https://docs.joinmastodon.org/entities/Error/ -shaped error body, reused
/// for every JSON error response this service returns.
#[derive(Serialize)]
pub struct HttpErrorData {
    error: String,
    error_description: Option<String>,
}

impl ResponseError for HttpError {
    fn error_response(&self) -> HttpResponse {
        let message = self.error_message();
        let body = HttpErrorData { error: message.clone(), error_description: Some(message) };
        HttpResponseBuilder::new(self.status_code()).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::AuthError(_) => StatusCode::UNAUTHORIZED,
            Self::ForbiddenReferrer => StatusCode::FORBIDDEN,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::NotFoundError(_) => StatusCode::NOT_FOUND,
            Self::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_hides_database_details() {
        let error = HttpError::DatabaseError(DatabaseError::NotFound("x"));
        assert_eq!(error.error_message(), "database error");
    }

    #[test]
    fn test_error_message_collapses_sensitive_markers() {
        let error = HttpError::InternalError("invalid token supplied".to_owned());
        assert_eq!(error.error_message(), "an internal error occurred");
        let error = HttpError::AuthError("connection refused talking to mastodon");
        assert_eq!(error.error_message(), "an internal error occurred");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(HttpError::ValidationError("x".to_owned()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(HttpError::RateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(HttpError::NotConfigured("llm").status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
