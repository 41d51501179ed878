//! HTTP handlers for batch management endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::Batch;
use crate::services::batch::{BatchService, CreateBatchInput, UpdateBatchInput};
use crate::AppState;
use shared::{PaginatedResponse, Pagination};

#[derive(Deserialize)]
pub struct BatchListQuery {
    pub is_draft: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Create a draft batch
pub async fn create_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateBatchInput>,
) -> AppResult<Json<Batch>> {
    let service = BatchService::new(state.db);
    let batch = service.create_draft(current_user.0.user_id, input).await?;
    Ok(Json(batch))
}

/// Finalize a draft batch
pub async fn finalize_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<Batch>> {
    let service = BatchService::new(state.db);
    let batch = service.finalize(current_user.0.user_id, batch_id).await?;
    Ok(Json(batch))
}

/// Update a batch (draft or finalized)
pub async fn update_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
    Json(input): Json<UpdateBatchInput>,
) -> AppResult<Json<Batch>> {
    let service = BatchService::new(state.db);
    let batch = service
        .update(current_user.0.user_id, batch_id, input)
        .await?;
    Ok(Json(batch))
}

/// Delete a batch
pub async fn delete_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = BatchService::new(state.db);
    service.delete(current_user.0.user_id, batch_id).await?;
    Ok(Json(()))
}

/// Get a batch by id
pub async fn get_batch(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<Batch>> {
    let service = BatchService::new(state.db);
    let batch = service.get(batch_id).await?;
    Ok(Json(batch))
}

/// Get a batch by batch number
pub async fn get_batch_by_number(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(batch_number): Path<String>,
) -> AppResult<Json<Batch>> {
    let service = BatchService::new(state.db);
    let batch = service.get_by_number(&batch_number).await?;
    Ok(Json(batch))
}

/// List batches with optional draft filter
pub async fn list_batches(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<BatchListQuery>,
) -> AppResult<Json<PaginatedResponse<Batch>>> {
    let pagination = Pagination {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    };
    let service = BatchService::new(state.db);
    let batches = service.list(query.is_draft, pagination).await?;
    Ok(Json(batches))
}
