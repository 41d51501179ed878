//! HTTP handlers for the medicine catalog

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::Medicine;
use crate::services::medicine::{CreateMedicineInput, MedicineService, UpdateMedicineInput};
use crate::AppState;
use shared::{PaginatedResponse, Pagination};

#[derive(Deserialize)]
pub struct MedicineListQuery {
    pub include_inactive: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Add a medicine to the catalog
pub async fn create_medicine(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<CreateMedicineInput>,
) -> AppResult<Json<Medicine>> {
    let service = MedicineService::new(state.db);
    let medicine = service.create(input).await?;
    Ok(Json(medicine))
}

/// Update a catalog entry
pub async fn update_medicine(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<UpdateMedicineInput>,
) -> AppResult<Json<Medicine>> {
    let service = MedicineService::new(state.db);
    let medicine = service.update(id, input).await?;
    Ok(Json(medicine))
}

/// Deactivate a medicine
pub async fn deactivate_medicine(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Medicine>> {
    let service = MedicineService::new(state.db);
    let medicine = service.deactivate(id).await?;
    Ok(Json(medicine))
}

/// Get a medicine by id
pub async fn get_medicine(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Medicine>> {
    let service = MedicineService::new(state.db);
    let medicine = service.get(id).await?;
    Ok(Json(medicine))
}

/// List medicines
pub async fn list_medicines(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<MedicineListQuery>,
) -> AppResult<Json<PaginatedResponse<Medicine>>> {
    let pagination = Pagination {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    };
    let service = MedicineService::new(state.db);
    let medicines = service
        .list(query.include_inactive.unwrap_or(false), pagination)
        .await?;
    Ok(Json(medicines))
}
