//! HTTP handlers for the discard workflow

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::DiscardRecord;
use crate::services::discard::{DiscardInput, DiscardService};
use crate::AppState;
use shared::{PaginatedResponse, Pagination};

#[derive(Deserialize)]
pub struct DiscardListQuery {
    pub medicine_id: Option<i64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Discard stock for a medicine across finalized batches
pub async fn create_discard(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<DiscardInput>,
) -> AppResult<Json<Vec<DiscardRecord>>> {
    let service = DiscardService::new(state.db);
    let records = service.discard(current_user.0.user_id, input).await?;
    Ok(Json(records))
}

/// List discard history
pub async fn list_discards(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<DiscardListQuery>,
) -> AppResult<Json<PaginatedResponse<DiscardRecord>>> {
    let pagination = Pagination {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    };
    let service = DiscardService::new(state.db);
    let records = service.list(query.medicine_id, pagination).await?;
    Ok(Json(records))
}
