//! # AppError
//!
//! Centralized error handling for HeartConnect.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all domain and service operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Rejected input (missing field, malformed recipient, text too long)
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or rejected bearer token
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The caller is authenticated but not a party to the resource
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (e.g., Message)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// The message or feedback store failed
    #[error("persistence failure: {0:#}")]
    Persistence(#[source] anyhow::Error),

    /// The identity provider's directory failed
    #[error("directory failure: {0:#}")]
    Directory(#[source] anyhow::Error),

    /// Anything else that should surface as a generic server failure
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn persistence(err: anyhow::Error) -> Self {
        Self::Persistence(err)
    }

    pub fn directory(err: anyhow::Error) -> Self {
        Self::Directory(err)
    }

    /// True for failures that are the server's fault rather than the caller's.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Directory(_) | Self::Internal(_))
    }
}

/// A specialized Result type for HeartConnect logic.
pub type Result<T> = std::result::Result<T, AppError>;
