//! Activity log service
//!
//! Append-only: the write path is `record`, invoked inside the mutating
//! caller's transaction; no update or delete is exposed. Reads are always
//! ordered newest-first.

use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{truncate_details, ActivityLogEntry, BatchAction, FieldChange};
use shared::{PaginatedResponse, Pagination, PaginationMeta};

/// Activity log service for the batch audit trail
#[derive(Clone)]
pub struct ActivityService {
    db: PgPool,
}

/// Row for activity queries
#[derive(sqlx::FromRow)]
struct ActivityRow {
    id: Uuid,
    batch_id: Uuid,
    batch_number: String,
    action: String,
    details: String,
    owner: Uuid,
    changes: Json<Vec<FieldChange>>,
    timestamp: DateTime<Utc>,
}

impl ActivityRow {
    fn into_entry(self) -> AppResult<ActivityLogEntry> {
        let action = BatchAction::from_str(&self.action)
            .ok_or_else(|| AppError::Internal(format!("Unknown log action {}", self.action)))?;
        Ok(ActivityLogEntry {
            id: self.id,
            batch_id: self.batch_id,
            batch_number: self.batch_number,
            action,
            details: self.details,
            owner: self.owner,
            changes: self.changes.0,
            timestamp: self.timestamp,
        })
    }
}

/// Append one entry as part of the caller's transaction, so the entry and
/// the mutation it describes commit together. This is the only write path
/// into the log.
pub(crate) async fn record(
    conn: &mut PgConnection,
    batch_id: Uuid,
    batch_number: &str,
    action: BatchAction,
    details: &str,
    owner: Uuid,
    changes: &[FieldChange],
) -> AppResult<ActivityLogEntry> {
    let row = sqlx::query_as::<_, ActivityRow>(
        r#"
        INSERT INTO activity_log (batch_id, batch_number, action, details, owner, changes)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, batch_id, batch_number, action, details, owner, changes, timestamp
        "#,
    )
    .bind(batch_id)
    .bind(batch_number)
    .bind(action.as_str())
    .bind(truncate_details(details))
    .bind(owner)
    .bind(Json(changes))
    .fetch_one(conn)
    .await?;

    row.into_entry()
}

impl ActivityService {
    /// Create a new ActivityService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Entries for one batch id, newest first.
    pub async fn query_by_batch_id(&self, batch_id: Uuid) -> AppResult<Vec<ActivityLogEntry>> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT id, batch_id, batch_number, action, details, owner, changes, timestamp
            FROM activity_log
            WHERE batch_id = $1
            ORDER BY timestamp DESC
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(ActivityRow::into_entry).collect()
    }

    /// Entries for one batch number, newest first.
    pub async fn query_by_batch_number(
        &self,
        batch_number: &str,
    ) -> AppResult<Vec<ActivityLogEntry>> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT id, batch_id, batch_number, action, details, owner, changes, timestamp
            FROM activity_log
            WHERE batch_number = $1
            ORDER BY timestamp DESC
            "#,
        )
        .bind(batch_number)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(ActivityRow::into_entry).collect()
    }

    /// All entries, newest first, paginated.
    pub async fn query_all(
        &self,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<ActivityLogEntry>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activity_log")
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT id, batch_id, batch_number, action, details, owner, changes, timestamp
            FROM activity_log
            ORDER BY timestamp DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows
            .into_iter()
            .map(ActivityRow::into_entry)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta::new(&pagination, total as u64),
        })
    }
}
