//! Sync endpoint protocol
//!
//! Transport-independent request handling. The HTTP layer turns each route into
//! a `SyncRequest`, passes the caller along, and sends back whatever
//! `SyncResponse` comes out. Every request is checked against the edit
//! capability before the path or body is looked at.

use axum::body::Bytes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::error;

use crate::auth::Caller;
use crate::context::AppContext;
use crate::error::{ErrorKind, SyncError, SyncResult};
use crate::identity::IdentityIndex;
use crate::model::RecordPayload;
use crate::sanitize::is_valid_external_id;
use crate::upsert::UpsertEngine;

/// One protocol operation
#[derive(Debug, Clone)]
pub enum SyncRequest {
    /// Create the record, or update it if the body's `externalId` is known
    CreateOrUpdate { body: Bytes },
    /// Update an existing record; the path id wins over the body id
    Update { external_id: String, body: Bytes },
    Get { external_id: String },
    Delete { external_id: String },
}

/// Status plus JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct SyncResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl SyncResponse {
    fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    fn from_error(err: &SyncError) -> Self {
        Self::new(
            err.status_code(),
            json!({
                "status": "error",
                "code": err.code(),
                "message": err.public_message(),
            }),
        )
    }
}

impl IntoResponse for SyncResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Request dispatcher for the sync protocol
pub struct SyncEndpoint {
    ctx: AppContext,
}

impl SyncEndpoint {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// Handle one request to completion
    pub async fn on_request_received(&self, caller: &Caller, request: SyncRequest) -> SyncResponse {
        match self.handle(caller, request).await {
            Ok(response) => response,
            Err(err) => {
                if err.kind() == ErrorKind::Internal {
                    error!("Sync request failed: {}", err);
                }
                SyncResponse::from_error(&err)
            }
        }
    }

    async fn handle(&self, caller: &Caller, request: SyncRequest) -> SyncResult<SyncResponse> {
        self.authorize(caller)?;

        match request {
            SyncRequest::CreateOrUpdate { body } => {
                let payload = parse_body(&body)?;
                let outcome = UpsertEngine::new(&self.ctx).upsert(&payload).await?;

                let (status, label) = if outcome.created {
                    (StatusCode::CREATED, "created")
                } else {
                    (StatusCode::OK, "updated")
                };
                Ok(SyncResponse::new(
                    status,
                    json!({
                        "status": label,
                        "entityId": outcome.entity.id,
                        "url": outcome.entity.url,
                    }),
                ))
            }
            SyncRequest::Update { external_id, body } => {
                let external_id = path_id(external_id)?;
                let payload = parse_body(&body)?;
                let outcome = UpsertEngine::new(&self.ctx)
                    .update(&external_id, &payload)
                    .await?;

                Ok(SyncResponse::new(
                    StatusCode::OK,
                    json!({
                        "status": "updated",
                        "entityId": outcome.entity.id,
                        "url": outcome.entity.url,
                    }),
                ))
            }
            SyncRequest::Get { external_id } => {
                let external_id = path_id(external_id)?;
                let record = IdentityIndex::new(&self.ctx)
                    .load_record(&external_id)
                    .await?
                    .ok_or(SyncError::NotFound(external_id))?;

                Ok(SyncResponse::new(
                    StatusCode::OK,
                    json!({ "status": "success", "data": record }),
                ))
            }
            SyncRequest::Delete { external_id } => {
                let external_id = path_id(external_id)?;
                UpsertEngine::new(&self.ctx).delete(&external_id).await?;

                Ok(SyncResponse::new(StatusCode::OK, json!({ "status": "deleted" })))
            }
        }
    }

    fn authorize(&self, caller: &Caller) -> SyncResult<()> {
        if self.ctx.capability.can_edit_content(caller) {
            return Ok(());
        }
        if caller.has_credentials() {
            Err(SyncError::Forbidden)
        } else {
            Err(SyncError::Unauthorized)
        }
    }
}

/// Path ids outside the identifier alphabet never match a record
fn path_id(external_id: String) -> SyncResult<String> {
    if is_valid_external_id(&external_id) {
        Ok(external_id)
    } else {
        Err(SyncError::NotFound(external_id))
    }
}

fn parse_body(body: &[u8]) -> SyncResult<RecordPayload> {
    serde_json::from_slice(body).map_err(|e| SyncError::MalformedBody(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticCapability;
    use crate::store::SqliteContentStore;
    use std::sync::Arc;

    async fn endpoint(can_edit: bool) -> SyncEndpoint {
        let pool = tsync_common::db::init_memory_database().await.unwrap();
        let ctx = AppContext::new(
            Arc::new(SqliteContentStore::new(pool)),
            Arc::new(StaticCapability(can_edit)),
            "https://site.test",
        );
        SyncEndpoint::new(ctx)
    }

    fn body(value: Value) -> Bytes {
        Bytes::from(value.to_string())
    }

    #[tokio::test]
    async fn test_capability_is_checked_before_path_and_body() {
        let endpoint = endpoint(false).await;

        let response = endpoint
            .on_request_received(
                &Caller::anonymous(),
                SyncRequest::Update {
                    external_id: "bad id!".into(),
                    body: Bytes::from_static(b"{not json"),
                },
            )
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.body["code"], "UNAUTHORIZED");

        let response = endpoint
            .on_request_received(
                &Caller::with_token("reader"),
                SyncRequest::CreateOrUpdate {
                    body: Bytes::from_static(b"{not json"),
                },
            )
            .await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_create_then_update_statuses() {
        let endpoint = endpoint(true).await;
        let caller = Caller::anonymous();
        let payload = json!({ "externalId": "abc", "title": "Samai Bayati" });

        let created = endpoint
            .on_request_received(&caller, SyncRequest::CreateOrUpdate { body: body(payload.clone()) })
            .await;
        assert_eq!(created.status, StatusCode::CREATED);
        assert_eq!(created.body["status"], "created");
        assert_eq!(created.body["url"], "https://site.test/samai-bayati/");

        let updated = endpoint
            .on_request_received(&caller, SyncRequest::CreateOrUpdate { body: body(payload) })
            .await;
        assert_eq!(updated.status, StatusCode::OK);
        assert_eq!(updated.body["status"], "updated");
        assert_eq!(updated.body["entityId"], created.body["entityId"]);
    }

    #[tokio::test]
    async fn test_path_id_wins_over_body_id() {
        let endpoint = endpoint(true).await;
        let caller = Caller::anonymous();
        endpoint
            .on_request_received(
                &caller,
                SyncRequest::CreateOrUpdate {
                    body: body(json!({ "externalId": "path-id", "title": "One" })),
                },
            )
            .await;

        let response = endpoint
            .on_request_received(
                &caller,
                SyncRequest::Update {
                    external_id: "path-id".into(),
                    body: body(json!({ "externalId": "other-id", "composer": "Qasabgi" })),
                },
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);

        let fetched = endpoint
            .on_request_received(&caller, SyncRequest::Get { external_id: "path-id".into() })
            .await;
        assert_eq!(fetched.body["data"]["externalId"], "path-id");
        assert_eq!(fetched.body["data"]["composer"], "Qasabgi");

        let other = endpoint
            .on_request_received(&caller, SyncRequest::Get { external_id: "other-id".into() })
            .await;
        assert_eq!(other.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_errors_have_uniform_shape() {
        let endpoint = endpoint(true).await;

        let response = endpoint
            .on_request_received(
                &Caller::anonymous(),
                SyncRequest::CreateOrUpdate { body: Bytes::from_static(b"[1, 2]") },
            )
            .await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["status"], "error");
        assert_eq!(response.body["code"], "MALFORMED_BODY");
        assert!(response.body["message"].is_string());
    }

    #[tokio::test]
    async fn test_invalid_path_id_is_not_found() {
        let endpoint = endpoint(true).await;

        let response = endpoint
            .on_request_received(
                &Caller::anonymous(),
                SyncRequest::Delete { external_id: "../etc".into() },
            )
            .await;

        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }
}
