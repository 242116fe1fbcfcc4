//! HTTP API handlers for tsync-api

pub mod entry;
pub mod health;
pub mod list;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::error::SyncError;

pub use entry::{create_or_update_entry, delete_entry, get_entry, update_entry};
pub use health::health_routes;
pub use list::list_entries;

/// Failures raised by the HTTP layer itself rather than the sync protocol
#[derive(Debug)]
pub enum ApiError {
    /// No route matched
    RouteNotFound(String),
    Sync(SyncError),
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        ApiError::Sync(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::RouteNotFound(path) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("No route for {}", path),
            ),
            ApiError::Sync(err) => {
                if err.status_code().is_server_error() {
                    error!("Request failed: {}", err);
                }
                (err.status_code(), err.code(), err.public_message())
            }
        };

        let body = Json(json!({
            "status": "error",
            "code": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Fallback for unmatched routes
pub async fn not_found(uri: axum::http::Uri) -> ApiError {
    ApiError::RouteNotFound(uri.path().to_string())
}
