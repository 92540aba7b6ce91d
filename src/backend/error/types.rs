/**
 * Backend Error Types
 *
 * Errors surfaced by HTTP handlers. Every variant maps to a status code and a
 * client-facing message, and converts into a JSON response (see
 * `conversion.rs`).
 *
 * # Error Categories
 *
 * ## Handler Errors
 *
 * Raised directly by handlers for bad input: unparsable query parameters,
 * unknown users, a redirect whose recipient is not connected here.
 *
 * ## Repository Errors
 *
 * Failures of the persistence collaborator. `NotFound` and `AlreadyExists`
 * become 404 and 409; everything else is a 500 whose details are logged but
 * not echoed to the client.
 *
 * ## Store Errors
 *
 * The shared key/value store is unavailable (503).
 */

use axum::http::StatusCode;
use thiserror::Error;

use crate::backend::repository::RepositoryError;
use crate::backend::store::StoreError;
use crate::shared::SharedError;

/// Backend-specific error types
#[derive(Debug, Error)]
pub enum BackendError {
    /// Handler error (e.g. malformed query, unknown user)
    #[error("Handler error: {message}")]
    HandlerError {
        /// HTTP status code for this error
        status: StatusCode,
        /// Human-readable error message
        message: String,
    },

    #[error(transparent)]
    RepositoryError(#[from] RepositoryError),

    #[error(transparent)]
    StoreError(#[from] StoreError),

    /// Wire decode or validation error
    #[error(transparent)]
    SharedError(#[from] SharedError),
}

impl BackendError {
    /// Create a new handler error with a status code
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::HandlerError {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::handler(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::handler(StatusCode::NOT_FOUND, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::handler(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::HandlerError { status, .. } => *status,
            Self::RepositoryError(RepositoryError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::RepositoryError(RepositoryError::AlreadyExists(_)) => StatusCode::CONFLICT,
            Self::RepositoryError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::StoreError(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::SharedError(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Get the client-facing message for this error
    pub fn message(&self) -> String {
        match self {
            Self::HandlerError { message, .. } => message.clone(),
            Self::RepositoryError(e @ RepositoryError::NotFound(_))
            | Self::RepositoryError(e @ RepositoryError::AlreadyExists(_)) => e.to_string(),
            Self::RepositoryError(_) => "internal storage error".to_string(),
            Self::StoreError(_) => "session store unavailable".to_string(),
            Self::SharedError(e) => e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_error() {
        let err = BackendError::bad_request("invalid user id");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "invalid user id");
    }

    #[test]
    fn test_repository_error_mapping() {
        let err: BackendError = RepositoryError::NotFound("user").into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "user not found");

        let err: BackendError = RepositoryError::AlreadyExists("user").into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err: BackendError = RepositoryError::Unavailable("pool closed".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message().contains("pool closed"));
    }

    #[test]
    fn test_store_error_is_unavailable() {
        let err: BackendError = StoreError::Unavailable("down".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
