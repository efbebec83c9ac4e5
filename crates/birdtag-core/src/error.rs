//! Error types module
//!
//! All errors surfaced by the query, mutation, deletion and notification paths are
//! unified under `AppError`. Each variant self-describes its HTTP presentation through
//! the `ErrorMetadata` trait so the API crate can render them uniformly.
//!
//! The `Database` variant wraps `sqlx::Error` when the `sqlx` feature is enabled.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "INVALID_QUERY")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried by the caller)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[error("Metadata store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Malformed address: {0}")]
    MalformedAddress(String),

    #[error("Signing error: {0}")]
    SigningError(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Partial deletion failure: {0}")]
    PartialDeletionFailure(String),

    #[error("Publish failure: {0}")]
    PublishFailure(String),

    #[error("Detection failed: {0}")]
    Detection(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        #[cfg(feature = "sqlx")]
        AppError::Database(_) => (
            503,
            "STORE_UNAVAILABLE",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::StoreUnavailable(_) => (
            503,
            "STORE_UNAVAILABLE",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InvalidQuery(_) => (
            400,
            "INVALID_QUERY",
            false,
            Some("Provide at least one tag filter with a non-negative count"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the file or address exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::MalformedAddress(_) => (
            400,
            "MALFORMED_ADDRESS",
            false,
            Some("Use an s3://bucket/key or https://bucket.s3.amazonaws.com/key address"),
            false,
            LogLevel::Debug,
        ),
        AppError::SigningError(_) => (
            500,
            "SIGNING_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::PartialDeletionFailure(_) => (
            500,
            "PARTIAL_DELETION_FAILURE",
            true,
            Some("Retry deleting the failed items"),
            false,
            LogLevel::Warn,
        ),
        AppError::PublishFailure(_) => (
            502,
            "PUBLISH_FAILURE",
            true,
            Some("Retry after a short delay"),
            false,
            LogLevel::Warn,
        ),
        AppError::Detection(_) => (
            502,
            "DETECTION_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::MethodNotAllowed(_) => (
            405,
            "METHOD_NOT_ALLOWED",
            false,
            Some("Check the HTTP method for this endpoint"),
            false,
            LogLevel::Debug,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error kind name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            #[cfg(feature = "sqlx")]
            AppError::Database(_) => "StoreUnavailable",
            AppError::StoreUnavailable(_) => "StoreUnavailable",
            AppError::InvalidQuery(_) => "InvalidQuery",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::MalformedAddress(_) => "MalformedAddress",
            AppError::SigningError(_) => "SigningError",
            AppError::Storage(_) => "Storage",
            AppError::PartialDeletionFailure(_) => "PartialDeletionFailure",
            AppError::PublishFailure(_) => "PublishFailure",
            AppError::Detection(_) => "Detection",
            AppError::MethodNotAllowed(_) => "MethodNotAllowed",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            #[cfg(feature = "sqlx")]
            AppError::Database(_) => "Failed to access metadata store".to_string(),
            AppError::StoreUnavailable(_) => "Failed to access metadata store".to_string(),
            AppError::InvalidQuery(ref msg) => msg.clone(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::MalformedAddress(ref msg) => msg.clone(),
            AppError::SigningError(_) => "Failed to generate access URL".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::PartialDeletionFailure(ref msg) => msg.clone(),
            AppError::PublishFailure(ref msg) => msg.clone(),
            AppError::Detection(_) => "Species detection failed".to_string(),
            AppError::MethodNotAllowed(ref msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_invalid_query() {
        let err = AppError::InvalidQuery("At least one tag filter is required".to_string());
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "INVALID_QUERY");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "At least one tag filter is required");
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_not_found() {
        let err = AppError::NotFound("Thumbnail not found".to_string());
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert_eq!(err.error_type(), "NotFound");
        assert_eq!(err.client_message(), "Thumbnail not found");
    }

    #[test]
    fn test_error_metadata_store_unavailable_is_sensitive() {
        let err = AppError::StoreUnavailable("connection refused".to_string());
        assert_eq!(err.http_status_code(), 503);
        assert!(err.is_recoverable());
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "Failed to access metadata store");
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_signing_error_hides_backend_message() {
        let err = AppError::SigningError("credential expired".to_string());
        assert_eq!(err.error_code(), "SIGNING_ERROR");
        assert!(!err.client_message().contains("credential"));
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let err = AppError::from(anyhow::anyhow!("inner failure").context("outer context"));
        let details = err.detailed_message();
        assert!(details.contains("Internal error with source"));
        assert!(details.contains("Caused by"));
    }
}
