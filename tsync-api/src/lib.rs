//! tsync-api library - transcriptions sync service
//!
//! Keeps local content entities in step with records pushed by an external
//! content source. Records are matched by their external identifier, validated,
//! sanitized and written in one store transaction per request.

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod auth;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod identity;
pub mod listing;
pub mod model;
pub mod sanitize;
pub mod store;
pub mod upsert;

pub use context::AppContext;
pub use endpoint::{SyncEndpoint, SyncRequest, SyncResponse};
pub use error::{SyncError, SyncResult};

/// Route prefix of the sync protocol
pub const API_PREFIX: &str = "/transcriptions/v1";

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub endpoint: Arc<SyncEndpoint>,
}

impl AppState {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            endpoint: Arc::new(SyncEndpoint::new(ctx)),
        }
    }
}

/// Build application router
///
/// Record routes check the edit capability inside the endpoint; the list and
/// health routes are public.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let sync = Router::new()
        .route("/entry", post(api::create_or_update_entry))
        .route(
            "/entry/:external_id",
            get(api::get_entry)
                .put(api::update_entry)
                .delete(api::delete_entry),
        )
        .route("/list", get(api::list_entries));

    Router::new()
        .nest(API_PREFIX, sync)
        .merge(api::health_routes())
        .fallback(api::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
