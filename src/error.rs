//! Application error type shared by services, repositories, and event handlers.

use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input that can never succeed (bad payload, invalid code).
    #[error("{message}")]
    Validation { message: String, details: Value },

    #[error("{message}")]
    NotFound { message: String, details: Value },

    #[error("{message}")]
    Conflict { message: String, details: Value },

    /// A downstream dependency (store, broker) failed; may succeed on retry.
    #[error("{message}")]
    Dependency { message: String, details: Value },

    #[error("{message}")]
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }
    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }
    pub fn conflict(message: impl Into<String>, details: Value) -> Self {
        Self::Conflict {
            message: message.into(),
            details,
        }
    }
    pub fn dependency(message: impl Into<String>, details: Value) -> Self {
        Self::Dependency {
            message: message.into(),
            details,
        }
    }
    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    /// Whether retrying the failed operation with the same input can succeed.
    ///
    /// Validation failures are permanent; everything else may clear up once
    /// the dependency recovers or the data changes.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, AppError::Validation { .. })
    }
}

pub fn map_sqlx_error(e: sqlx::Error) -> AppError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            return AppError::conflict(
                "Unique constraint violation",
                json!({ "constraint": db.constraint() }),
            );
        }
    }

    AppError::dependency("Database error", json!({ "source": e.to_string() }))
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        map_sqlx_error(e)
    }
}

impl From<lapin::Error> for AppError {
    fn from(e: lapin::Error) -> Self {
        AppError::dependency("Broker error", json!({ "source": e.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_is_not_retryable() {
        let err = AppError::bad_request("bad payload", json!({}));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_dependency_is_retryable() {
        let err = AppError::dependency("store down", json!({}));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_not_found_is_retryable() {
        // A missing row may appear later (or the message keeps requeueing,
        // matching the no-dead-letter policy).
        let err = AppError::not_found("no such stats", json!({}));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_error_display_uses_message() {
        let err = AppError::conflict("Short code already exists", json!({ "code": "abc" }));
        assert_eq!(err.to_string(), "Short code already exists");
    }
}
