//! HTTP handlers for the activity log

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::ActivityLogEntry;
use crate::services::ActivityService;
use crate::AppState;
use shared::{PaginatedResponse, Pagination};

#[derive(Deserialize)]
pub struct ActivityListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// List activity log entries, newest first
pub async fn list_activity(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ActivityListQuery>,
) -> AppResult<Json<PaginatedResponse<ActivityLogEntry>>> {
    let pagination = Pagination {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    };
    let service = ActivityService::new(state.db);
    let entries = service.query_all(pagination).await?;
    Ok(Json(entries))
}

/// Activity entries for one batch id
pub async fn get_batch_activity(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<Vec<ActivityLogEntry>>> {
    let service = ActivityService::new(state.db);
    let entries = service.query_by_batch_id(batch_id).await?;
    Ok(Json(entries))
}

/// Activity entries for one batch number
pub async fn get_batch_activity_by_number(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(batch_number): Path<String>,
) -> AppResult<Json<Vec<ActivityLogEntry>>> {
    let service = ActivityService::new(state.db);
    let entries = service.query_by_batch_number(&batch_number).await?;
    Ok(Json(entries))
}
