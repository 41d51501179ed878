//! Discard workflow service
//!
//! Removes expired or unwanted quantity from circulation. Consumption is
//! FIFO-by-expiry across finalized batches, all-or-nothing: availability is
//! evaluated against row-locked state before any batch is touched, and every
//! quantity change goes through the batch store's apply path so it is diffed
//! and logged like any other update.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    plan_discard, Batch, DiscardCandidate, DiscardPlanError, DiscardRecord, LineItem,
    DEFAULT_DISCARD_REASON,
};
use crate::services::batch::{apply_update, lock_finalized_batches_for_medicine, BatchPatch};
use shared::{PaginatedResponse, Pagination, PaginationMeta};

/// Discard workflow service
#[derive(Clone)]
pub struct DiscardService {
    db: PgPool,
}

/// Input for a discard action
#[derive(Debug, Deserialize)]
pub struct DiscardInput {
    pub medicine_id: i64,
    pub quantity: i64,
    pub reason: Option<String>,
    /// Restrict the discard to one batch instead of sweeping all of them.
    pub scope_batch_id: Option<Uuid>,
}

/// Row for discard record queries
#[derive(sqlx::FromRow)]
struct DiscardRow {
    id: Uuid,
    medicine_id: i64,
    medicine_name: String,
    batch_id: Uuid,
    batch_number: String,
    quantity_discarded: i64,
    price_per_unit: Decimal,
    total_value: Decimal,
    expiry_date: Option<chrono::NaiveDate>,
    reason: String,
    discarded_by: Uuid,
    discarded_at: chrono::DateTime<chrono::Utc>,
}

impl From<DiscardRow> for DiscardRecord {
    fn from(row: DiscardRow) -> Self {
        DiscardRecord {
            id: row.id,
            medicine_id: row.medicine_id,
            medicine_name: row.medicine_name,
            batch_id: row.batch_id,
            batch_number: row.batch_number,
            quantity_discarded: row.quantity_discarded,
            price_per_unit: row.price_per_unit,
            total_value: row.total_value,
            expiry_date: row.expiry_date,
            reason: row.reason,
            discarded_by: row.discarded_by,
            discarded_at: row.discarded_at,
        }
    }
}

impl DiscardService {
    /// Create a new DiscardService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Discard `quantity` units of a medicine across finalized batches,
    /// earliest expiry first. Returns one record per batch touched.
    pub async fn discard(&self, actor: Uuid, input: DiscardInput) -> AppResult<Vec<DiscardRecord>> {
        let reason = input
            .reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DISCARD_REASON.to_string());

        let mut tx = self.db.begin().await?;

        // Lock every eligible batch up front: the availability check and the
        // per-batch writes then see the same state, so a discard is never
        // partially applied.
        let batches =
            lock_finalized_batches_for_medicine(&mut tx, input.medicine_id, input.scope_batch_id)
                .await?;

        let candidates = collect_candidates(&batches, input.medicine_id);
        let allocations = plan_discard(&candidates, input.quantity).map_err(|e| match e {
            DiscardPlanError::InvalidQuantity(q) => AppError::Validation {
                field: "quantity".to_string(),
                message: format!("Discard quantity must be at least 1, got {}", q),
            },
            DiscardPlanError::InsufficientStock {
                requested,
                available,
            } => AppError::InsufficientStock {
                medicine_id: input.medicine_id,
                requested,
                available,
            },
        })?;

        let mut records = Vec::with_capacity(allocations.len());
        for allocation in allocations {
            let batch = batches
                .iter()
                .find(|b| b.id == allocation.batch_id)
                .ok_or_else(|| AppError::Internal("Planned batch missing from lock set".into()))?;

            let (line_items, medicine_name) =
                consume_from_batch(batch, input.medicine_id, allocation.quantity)?;

            let details = format!(
                "Discarded {} unit(s) of {}: {}",
                allocation.quantity, medicine_name, reason
            );
            let patch = BatchPatch {
                line_items,
                miscellaneous_amount: batch.miscellaneous_amount,
                attachments: batch.attachments.clone(),
                draft_note: batch.draft_note.clone(),
            };
            apply_update(&mut tx, batch, patch, actor, &details).await?;

            let row = sqlx::query_as::<_, DiscardRow>(
                r#"
                INSERT INTO discard_records (medicine_id, medicine_name, batch_id, batch_number,
                                             quantity_discarded, price_per_unit, total_value,
                                             expiry_date, reason, discarded_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING id, medicine_id, medicine_name, batch_id, batch_number,
                          quantity_discarded, price_per_unit, total_value, expiry_date, reason,
                          discarded_by, discarded_at
                "#,
            )
            .bind(input.medicine_id)
            .bind(&medicine_name)
            .bind(allocation.batch_id)
            .bind(&allocation.batch_number)
            .bind(allocation.quantity)
            .bind(allocation.price_per_unit)
            .bind(allocation.total_value())
            .bind(allocation.expiry_date)
            .bind(&reason)
            .bind(actor)
            .fetch_one(&mut *tx)
            .await?;

            records.push(row.into());
        }

        tx.commit().await?;
        Ok(records)
    }

    /// Discard history, newest first, optionally filtered by medicine.
    pub async fn list(
        &self,
        medicine_id: Option<i64>,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<DiscardRecord>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM discard_records WHERE ($1::bigint IS NULL OR medicine_id = $1)",
        )
        .bind(medicine_id)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, DiscardRow>(
            r#"
            SELECT id, medicine_id, medicine_name, batch_id, batch_number, quantity_discarded,
                   price_per_unit, total_value, expiry_date, reason, discarded_by, discarded_at
            FROM discard_records
            WHERE ($1::bigint IS NULL OR medicine_id = $1)
            ORDER BY discarded_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(medicine_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: rows.into_iter().map(DiscardRecord::from).collect(),
            pagination: PaginationMeta::new(&pagination, total as u64),
        })
    }
}

/// Planner view of each locked batch's line item for the medicine.
fn collect_candidates(batches: &[Batch], medicine_id: i64) -> Vec<DiscardCandidate> {
    batches
        .iter()
        .filter_map(|batch| {
            batch
                .line_items
                .iter()
                .find(|item| item.medicine_id == medicine_id)
                .map(|item| DiscardCandidate {
                    batch_id: batch.id,
                    batch_number: batch.batch_number.clone(),
                    expiry_date: item.expiry_date,
                    available: item.quantity,
                    price_per_unit: item.price,
                })
        })
        .collect()
}

/// Decrement the medicine's line item, leaving it in place even at zero so
/// historical pricing and expiry data survive.
fn consume_from_batch(
    batch: &Batch,
    medicine_id: i64,
    quantity: i64,
) -> AppResult<(Vec<LineItem>, String)> {
    let mut medicine_name = None;
    let line_items = batch
        .line_items
        .iter()
        .map(|item| {
            if item.medicine_id == medicine_id {
                medicine_name = Some(item.medicine_name.clone());
                let mut consumed = item.clone();
                consumed.quantity -= quantity;
                consumed.with_derived_total()
            } else {
                item.clone()
            }
        })
        .collect();

    let medicine_name = medicine_name.ok_or_else(|| {
        AppError::Internal(format!(
            "Batch {} has no line item for medicine {}",
            batch.batch_number, medicine_id
        ))
    })?;

    Ok((line_items, medicine_name))
}
