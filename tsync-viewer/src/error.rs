//! Error types for tsync-viewer

use std::time::Duration;
use thiserror::Error;

/// Viewer error type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewerError {
    /// Viewer mounted without a document URL
    #[error("PDF URL not found.")]
    MissingUrl,

    /// Document could not be opened (network failure, corrupt file)
    #[error("Failed to load document: {0}")]
    Load(String),

    #[error("Failed to render page {page}: {reason}")]
    Render { page: u32, reason: String },

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// The viewer's driver task has stopped
    #[error("Viewer is no longer running")]
    Closed,
}
