//! Error types for tsync-api
//!
//! `SyncError` is produced by the identity index, the upsert engine and the
//! endpoint protocol. Validation and not-found errors travel up untouched; only
//! `Store` failures are treated as unexpected and downgraded to a generic 500 at
//! the endpoint boundary.

use axum::http::StatusCode;
use thiserror::Error;

/// Error category, mapped one-to-one onto response status families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing/empty required field, malformed URL, unparseable body (400)
    Validation,
    /// Unknown external identifier (404)
    NotFound,
    /// Caller lacks credentials (401) or the edit capability (403)
    Authorization,
    /// Unexpected persistence failure (500)
    Internal,
}

/// Sync layer error type
#[derive(Debug, Error)]
pub enum SyncError {
    /// Required field absent or empty
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Field present but malformed
    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// Request body is not a JSON object of the expected shape
    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    /// No live entity holds the external identifier
    #[error("Transcription not found: {0}")]
    NotFound(String),

    /// No credentials presented
    #[error("Authentication required")]
    Unauthorized,

    /// Credentials presented but without the content-edit capability
    #[error("Not allowed to edit content")]
    Forbidden,

    /// Persistence failure
    #[error(transparent)]
    Store(#[from] tsync_common::Error),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::MissingField(_)
            | SyncError::InvalidField { .. }
            | SyncError::MalformedBody(_) => ErrorKind::Validation,
            SyncError::NotFound(_) => ErrorKind::NotFound,
            SyncError::Unauthorized | SyncError::Forbidden => ErrorKind::Authorization,
            SyncError::Store(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            SyncError::MissingField(_)
            | SyncError::InvalidField { .. }
            | SyncError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            SyncError::NotFound(_) => StatusCode::NOT_FOUND,
            SyncError::Unauthorized => StatusCode::UNAUTHORIZED,
            SyncError::Forbidden => StatusCode::FORBIDDEN,
            SyncError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for response bodies
    pub fn code(&self) -> &'static str {
        match self {
            SyncError::MissingField(_) => "MISSING_FIELD",
            SyncError::InvalidField { .. } => "INVALID_FIELD",
            SyncError::MalformedBody(_) => "MALFORMED_BODY",
            SyncError::NotFound(_) => "NOT_FOUND",
            SyncError::Unauthorized => "UNAUTHORIZED",
            SyncError::Forbidden => "FORBIDDEN",
            SyncError::Store(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to the caller
    ///
    /// Internal failures never leak their detail.
    pub fn public_message(&self) -> String {
        match self {
            SyncError::Store(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type for the sync layer
pub type SyncResult<T> = Result<T, SyncError>;
