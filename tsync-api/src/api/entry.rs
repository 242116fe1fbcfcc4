//! Record routes under /transcriptions/v1/entry
//!
//! Thin adapters: each handler builds a `SyncRequest` and hands it to the
//! endpoint together with the caller's credentials.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
};

use crate::auth::Caller;
use crate::endpoint::{SyncRequest, SyncResponse};
use crate::AppState;

/// POST /transcriptions/v1/entry
pub async fn create_or_update_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> SyncResponse {
    let caller = Caller::from_headers(&headers);
    state
        .endpoint
        .on_request_received(&caller, SyncRequest::CreateOrUpdate { body })
        .await
}

/// PUT /transcriptions/v1/entry/:external_id
pub async fn update_entry(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> SyncResponse {
    let caller = Caller::from_headers(&headers);
    state
        .endpoint
        .on_request_received(&caller, SyncRequest::Update { external_id, body })
        .await
}

/// GET /transcriptions/v1/entry/:external_id
pub async fn get_entry(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
    headers: HeaderMap,
) -> SyncResponse {
    let caller = Caller::from_headers(&headers);
    state
        .endpoint
        .on_request_received(&caller, SyncRequest::Get { external_id })
        .await
}

/// DELETE /transcriptions/v1/entry/:external_id
pub async fn delete_entry(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
    headers: HeaderMap,
) -> SyncResponse {
    let caller = Caller::from_headers(&headers);
    state
        .endpoint
        .on_request_received(&caller, SyncRequest::Delete { external_id })
        .await
}
