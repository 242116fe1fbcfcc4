//! Public grouped listing

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;

use crate::api::ApiError;
use crate::listing::{load_grouped, EntryGroup, GroupBy, ListQuery};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub status: &'static str,
    pub groupby: GroupBy,
    pub groups: Vec<EntryGroup>,
}

/// GET /transcriptions/v1/list?groupby=maqam|composer|form
///
/// No authentication; only published records are listed.
pub async fn list_entries(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let by = GroupBy::parse(query.groupby.as_deref());
    let ctx = state.endpoint.context();
    let groups = load_grouped(ctx.store.as_ref(), &ctx.site_base, by).await?;

    Ok(Json(ListResponse {
        status: "success",
        groupby: by,
        groups,
    }))
}
