//! Unified error handling for OpsGate Core

use thiserror::Error;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Directory error: {0}")]
    Directory(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Failures of the directory transport that may clear up on retry, as
    /// opposed to a response the directory returned but we could not use.
    ///
    /// Resolvers cache no error either way; this only picks the log level.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Directory(_) | AppError::Timeout(_) | AppError::Http(_)
        )
    }

    /// Short label used as a metric dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Directory(_) => "directory",
            AppError::Timeout(_) => "timeout",
            AppError::Notification(_) => "notification",
            AppError::Config(_) => "config",
            AppError::Http(_) => "http",
            AppError::Serialization(_) => "serialization",
            AppError::Internal(_) => "internal",
        }
    }
}
