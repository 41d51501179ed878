//! Batch store service
//!
//! Owns the batch lifecycle: draft creation, the one-way draft -> finalized
//! transition, version-guarded updates, deletion, and reads. Every mutation
//! commits together with its activity log entry; the discard workflow reuses
//! the same apply path so its quantity changes are diffed and logged
//! identically.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{types::Json, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    diff_batches, line_total, overall_price, Batch, BatchAction, LineItem,
};
use crate::services::activity::record;
use shared::{
    validate_batch_number, validate_line_item, validate_for_finalize, AttachmentRef,
    PaginatedResponse, Pagination, PaginationMeta,
};

/// Batch store service
#[derive(Clone)]
pub struct BatchService {
    db: PgPool,
}

/// Caller-supplied line item; catalog snapshot fields are resolved at entry.
#[derive(Debug, Deserialize)]
pub struct LineItemInput {
    pub medicine_id: i64,
    pub quantity: i64,
    pub price: Decimal,
    pub expiry_date: Option<NaiveDate>,
    pub date_of_purchase: Option<NaiveDate>,
}

/// Input for creating a draft batch
#[derive(Debug, Deserialize)]
pub struct CreateBatchInput {
    /// Human-assigned batch number; generated when absent.
    pub batch_number: Option<String>,
    pub bill_id: Option<String>,
    #[serde(default)]
    pub line_items: Vec<LineItemInput>,
    pub miscellaneous_amount: Option<Decimal>,
    pub attachments: Option<Vec<AttachmentRef>>,
    pub draft_note: Option<String>,
}

/// Partial update of a batch's editable state
#[derive(Debug, Deserialize)]
pub struct UpdateBatchInput {
    pub line_items: Option<Vec<LineItemInput>>,
    pub miscellaneous_amount: Option<Decimal>,
    pub attachments: Option<Vec<AttachmentRef>>,
    pub draft_note: Option<String>,
}

/// Replacement state handed to the shared apply path.
pub(crate) struct BatchPatch {
    pub line_items: Vec<LineItem>,
    pub miscellaneous_amount: Decimal,
    pub attachments: Vec<AttachmentRef>,
    pub draft_note: Option<String>,
}

/// Row for batch queries
#[derive(sqlx::FromRow)]
struct BatchRow {
    id: Uuid,
    batch_number: String,
    bill_id: Option<String>,
    line_items: Json<Vec<LineItem>>,
    overall_price: Decimal,
    miscellaneous_amount: Decimal,
    attachments: Json<Vec<AttachmentRef>>,
    is_draft: bool,
    draft_note: Option<String>,
    finalized_at: Option<DateTime<Utc>>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl From<BatchRow> for Batch {
    fn from(row: BatchRow) -> Self {
        Batch {
            id: row.id,
            batch_number: row.batch_number,
            bill_id: row.bill_id,
            line_items: row.line_items.0,
            overall_price: row.overall_price,
            miscellaneous_amount: row.miscellaneous_amount,
            attachments: row.attachments.0,
            is_draft: row.is_draft,
            draft_note: row.draft_note,
            finalized_at: row.finalized_at,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
        }
    }
}

/// Fetch a batch by id without locking it.
pub(crate) async fn fetch_batch(
    conn: &mut PgConnection,
    batch_id: Uuid,
) -> AppResult<Option<Batch>> {
    let row = sqlx::query_as::<_, BatchRow>(
        r#"
        SELECT id, batch_number, bill_id, line_items, overall_price, miscellaneous_amount,
               attachments, is_draft, draft_note, finalized_at, created_by, created_at,
               updated_at, version
        FROM batches
        WHERE id = $1
        "#,
    )
    .bind(batch_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Batch::from))
}

/// Fetch a batch by id with a row lock, for mutations that must not race.
async fn fetch_batch_for_update(
    conn: &mut PgConnection,
    batch_id: Uuid,
) -> AppResult<Option<Batch>> {
    let row = sqlx::query_as::<_, BatchRow>(
        r#"
        SELECT id, batch_number, bill_id, line_items, overall_price, miscellaneous_amount,
               attachments, is_draft, draft_note, finalized_at, created_by, created_at,
               updated_at, version
        FROM batches
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(batch_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Batch::from))
}

/// Lock every finalized batch holding a line item for the given medicine,
/// in a deterministic order. Used by the discard workflow.
pub(crate) async fn lock_finalized_batches_for_medicine(
    conn: &mut PgConnection,
    medicine_id: i64,
    scope_batch_id: Option<Uuid>,
) -> AppResult<Vec<Batch>> {
    let contains = serde_json::json!([{ "medicine_id": medicine_id }]);
    let rows = sqlx::query_as::<_, BatchRow>(
        r#"
        SELECT id, batch_number, bill_id, line_items, overall_price, miscellaneous_amount,
               attachments, is_draft, draft_note, finalized_at, created_by, created_at,
               updated_at, version
        FROM batches
        WHERE is_draft = FALSE
          AND line_items @> $1
          AND ($2::uuid IS NULL OR id = $2)
        ORDER BY id
        FOR UPDATE
        "#,
    )
    .bind(contains)
    .bind(scope_batch_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(Batch::from).collect())
}

/// Apply a replacement of a batch's editable state as a single
/// read-check-write: the update only lands if the batch still carries the
/// version the caller read, and the field-level diff is logged in the same
/// transaction.
pub(crate) async fn apply_update(
    conn: &mut PgConnection,
    old: &Batch,
    patch: BatchPatch,
    actor: Uuid,
    details: &str,
) -> AppResult<Batch> {
    let line_items: Vec<LineItem> = patch
        .line_items
        .into_iter()
        .map(LineItem::with_derived_total)
        .collect();
    for item in &line_items {
        validate_line_item(item).map_err(AppError::ValidationError)?;
    }

    let mut next = old.clone();
    next.line_items = line_items;
    next.overall_price = overall_price(&next.line_items);
    next.miscellaneous_amount = patch.miscellaneous_amount;
    next.attachments = patch.attachments;
    next.draft_note = patch.draft_note;

    let changes = diff_batches(old, &next);

    let row = sqlx::query_as::<_, BatchRow>(
        r#"
        UPDATE batches
        SET line_items = $1, overall_price = $2, miscellaneous_amount = $3,
            attachments = $4, draft_note = $5, version = version + 1, updated_at = NOW()
        WHERE id = $6 AND version = $7
        RETURNING id, batch_number, bill_id, line_items, overall_price, miscellaneous_amount,
                  attachments, is_draft, draft_note, finalized_at, created_by, created_at,
                  updated_at, version
        "#,
    )
    .bind(Json(&next.line_items))
    .bind(next.overall_price)
    .bind(next.miscellaneous_amount)
    .bind(Json(&next.attachments))
    .bind(&next.draft_note)
    .bind(old.id)
    .bind(old.version)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| {
        AppError::WriteConflict(format!(
            "Batch {} was modified concurrently; retry the update",
            old.batch_number
        ))
    })?;

    record(
        conn,
        old.id,
        &old.batch_number,
        BatchAction::Updated,
        details,
        actor,
        &changes,
    )
    .await?;

    Ok(row.into())
}

impl BatchService {
    /// Create a new BatchService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Generate a batch number: PH-YYYY-NNNN
    async fn generate_batch_number(&self) -> AppResult<String> {
        let sequence: i64 = sqlx::query_scalar("SELECT nextval('batch_number_seq')")
            .fetch_one(&self.db)
            .await?;
        Ok(format!("PH-{}-{:04}", Utc::now().year(), sequence))
    }

    /// Create a draft batch and log the creation.
    pub async fn create_draft(&self, actor: Uuid, input: CreateBatchInput) -> AppResult<Batch> {
        let batch_number = match input.batch_number {
            Some(number) => {
                validate_batch_number(&number).map_err(|msg| AppError::Validation {
                    field: "batch_number".to_string(),
                    message: msg.to_string(),
                })?;
                number
            }
            None => self.generate_batch_number().await?,
        };

        // Uniqueness holds across drafts and finalized batches combined; the
        // unique index backstops the race window after this check.
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM batches WHERE batch_number = $1)")
                .bind(&batch_number)
                .fetch_one(&self.db)
                .await?;
        if exists {
            return Err(AppError::DuplicateBatchNumber(batch_number));
        }

        let mut tx = self.db.begin().await?;

        let line_items = resolve_line_items(&mut tx, &input.line_items, &[]).await?;
        let total = overall_price(&line_items);

        let insert = sqlx::query_as::<_, BatchRow>(
            r#"
            INSERT INTO batches (batch_number, bill_id, line_items, overall_price,
                                 miscellaneous_amount, attachments, is_draft, draft_note, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7, $8)
            RETURNING id, batch_number, bill_id, line_items, overall_price, miscellaneous_amount,
                      attachments, is_draft, draft_note, finalized_at, created_by, created_at,
                      updated_at, version
            "#,
        )
        .bind(&batch_number)
        .bind(&input.bill_id)
        .bind(Json(&line_items))
        .bind(total)
        .bind(input.miscellaneous_amount.unwrap_or(Decimal::ZERO))
        .bind(Json(input.attachments.as_deref().unwrap_or(&[])))
        .bind(&input.draft_note)
        .bind(actor)
        .fetch_one(&mut *tx)
        .await;

        let row = match insert {
            Ok(row) => row,
            Err(e) => {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return Err(AppError::DuplicateBatchNumber(batch_number));
                    }
                }
                return Err(e.into());
            }
        };

        let batch: Batch = row.into();
        record(
            &mut tx,
            batch.id,
            &batch.batch_number,
            BatchAction::Created,
            &format!(
                "Created draft batch with {} line item(s)",
                batch.line_items.len()
            ),
            actor,
            &[],
        )
        .await?;

        tx.commit().await?;
        Ok(batch)
    }

    /// One-way draft -> finalized transition.
    pub async fn finalize(&self, actor: Uuid, batch_id: Uuid) -> AppResult<Batch> {
        let mut tx = self.db.begin().await?;

        let batch = fetch_batch_for_update(&mut tx, batch_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Batch".to_string()))?;

        if !batch.is_draft {
            return Err(AppError::AlreadyFinalized(batch.batch_number));
        }
        validate_for_finalize(&batch.line_items).map_err(AppError::ValidationError)?;

        let row = sqlx::query_as::<_, BatchRow>(
            r#"
            UPDATE batches
            SET is_draft = FALSE, finalized_at = NOW(), version = version + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING id, batch_number, bill_id, line_items, overall_price, miscellaneous_amount,
                      attachments, is_draft, draft_note, finalized_at, created_by, created_at,
                      updated_at, version
            "#,
        )
        .bind(batch_id)
        .fetch_one(&mut *tx)
        .await?;

        let finalized: Batch = row.into();
        record(
            &mut tx,
            finalized.id,
            &finalized.batch_number,
            BatchAction::Finalized,
            &format!(
                "Finalized batch with {} line item(s), total {}",
                finalized.line_items.len(),
                finalized.overall_price
            ),
            actor,
            &[],
        )
        .await?;

        tx.commit().await?;
        Ok(finalized)
    }

    /// Update a batch (draft or finalized) with a partial replacement of its
    /// editable state. Optimistic: fails with a retryable conflict if the
    /// batch changed between read and write.
    pub async fn update(
        &self,
        actor: Uuid,
        batch_id: Uuid,
        input: UpdateBatchInput,
    ) -> AppResult<Batch> {
        let mut tx = self.db.begin().await?;

        let old = fetch_batch(&mut tx, batch_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Batch".to_string()))?;

        let line_items = match &input.line_items {
            Some(inputs) => resolve_line_items(&mut tx, inputs, &old.line_items).await?,
            None => old.line_items.clone(),
        };

        let patch = BatchPatch {
            line_items,
            miscellaneous_amount: input
                .miscellaneous_amount
                .unwrap_or(old.miscellaneous_amount),
            attachments: input
                .attachments
                .clone()
                .unwrap_or_else(|| old.attachments.clone()),
            draft_note: input.draft_note.clone().or_else(|| old.draft_note.clone()),
        };

        let details = format!("Updated batch {}", old.batch_number);
        let updated = apply_update(&mut tx, &old, patch, actor, &details).await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Delete a batch. The deletion entry commits in the same transaction,
    /// and earlier log entries and discard records stay queryable.
    pub async fn delete(&self, actor: Uuid, batch_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let batch = fetch_batch_for_update(&mut tx, batch_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Batch".to_string()))?;

        record(
            &mut tx,
            batch.id,
            &batch.batch_number,
            BatchAction::Deleted,
            &format!("Deleted batch {}", batch.batch_number),
            actor,
            &[],
        )
        .await?;

        sqlx::query("DELETE FROM batches WHERE id = $1")
            .bind(batch_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Get a batch by id.
    pub async fn get(&self, batch_id: Uuid) -> AppResult<Batch> {
        let mut conn = self.db.acquire().await?;
        fetch_batch(&mut conn, batch_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Batch".to_string()))
    }

    /// Get a batch by its batch number.
    pub async fn get_by_number(&self, batch_number: &str) -> AppResult<Batch> {
        let row = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT id, batch_number, bill_id, line_items, overall_price, miscellaneous_amount,
                   attachments, is_draft, draft_note, finalized_at, created_by, created_at,
                   updated_at, version
            FROM batches
            WHERE batch_number = $1
            "#,
        )
        .bind(batch_number)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Batch".to_string()))?;

        Ok(row.into())
    }

    /// List batches, optionally filtered by draft state, newest first.
    pub async fn list(
        &self,
        is_draft: Option<bool>,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<Batch>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM batches WHERE ($1::bool IS NULL OR is_draft = $1)",
        )
        .bind(is_draft)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT id, batch_number, bill_id, line_items, overall_price, miscellaneous_amount,
                   attachments, is_draft, draft_note, finalized_at, created_by, created_at,
                   updated_at, version
            FROM batches
            WHERE ($1::bool IS NULL OR is_draft = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(is_draft)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: rows.into_iter().map(Batch::from).collect(),
            pagination: PaginationMeta::new(&pagination, total as u64),
        })
    }
}

/// Build full line items from caller input, snapshotting catalog fields for
/// medicines new to the batch and keeping the original snapshot for ones
/// already present (names and thresholds do not track later catalog edits).
async fn resolve_line_items(
    conn: &mut PgConnection,
    inputs: &[LineItemInput],
    existing: &[LineItem],
) -> AppResult<Vec<LineItem>> {
    let mut items = Vec::with_capacity(inputs.len());
    let today = Utc::now().date_naive();

    for input in inputs {
        let prior = existing.iter().find(|i| i.medicine_id == input.medicine_id);

        let (medicine_name, reorder_level, date_of_purchase) = match prior {
            Some(item) => (
                item.medicine_name.clone(),
                item.reorder_level,
                item.date_of_purchase,
            ),
            None => {
                let row = sqlx::query_as::<_, (String, i64, bool)>(
                    "SELECT name, reorder_level, active FROM medicines WHERE id = $1",
                )
                .bind(input.medicine_id)
                .fetch_optional(&mut *conn)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Medicine {}", input.medicine_id))
                })?;

                if !row.2 {
                    return Err(AppError::Validation {
                        field: "medicine_id".to_string(),
                        message: format!("Medicine {} is inactive", row.0),
                    });
                }
                (row.0, row.1, input.date_of_purchase.unwrap_or(today))
            }
        };

        let item = LineItem {
            medicine_id: input.medicine_id,
            medicine_name,
            quantity: input.quantity,
            price: input.price,
            expiry_date: input.expiry_date,
            date_of_purchase: input.date_of_purchase.unwrap_or(date_of_purchase),
            reorder_level,
            total_amount: line_total(input.quantity, input.price),
        };
        validate_line_item(&item).map_err(AppError::ValidationError)?;
        items.push(item);
    }

    Ok(items)
}
