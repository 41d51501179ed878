//! Medicine catalog service
//!
//! Reference data for every other component. Entries are deactivated rather
//! than deleted so batch line items keep a valid reference.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::Medicine;
use shared::{PaginatedResponse, Pagination, PaginationMeta};

/// Medicine catalog service
#[derive(Clone)]
pub struct MedicineService {
    db: PgPool,
}

/// Input for creating a medicine
#[derive(Debug, Deserialize)]
pub struct CreateMedicineInput {
    pub name: String,
    pub category: String,
    pub manufacturer: String,
    pub reorder_level: i64,
}

/// Input for updating a medicine
#[derive(Debug, Deserialize)]
pub struct UpdateMedicineInput {
    pub name: Option<String>,
    pub category: Option<String>,
    pub manufacturer: Option<String>,
    pub reorder_level: Option<i64>,
}

type MedicineTuple = (
    i64,
    String,
    String,
    String,
    i64,
    bool,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn to_medicine(row: MedicineTuple) -> Medicine {
    Medicine {
        id: row.0,
        name: row.1,
        category: row.2,
        manufacturer: row.3,
        reorder_level: row.4,
        active: row.5,
        created_at: row.6,
        updated_at: row.7,
    }
}

impl MedicineService {
    /// Create a new MedicineService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Add a medicine to the catalog.
    pub async fn create(&self, input: CreateMedicineInput) -> AppResult<Medicine> {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Medicine name cannot be empty".to_string(),
            });
        }
        if input.reorder_level < 0 {
            return Err(AppError::Validation {
                field: "reorder_level".to_string(),
                message: "Reorder level cannot be negative".to_string(),
            });
        }

        let row = sqlx::query_as::<_, MedicineTuple>(
            r#"
            INSERT INTO medicines (name, category, manufacturer, reorder_level)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, category, manufacturer, reorder_level, active,
                      created_at, updated_at
            "#,
        )
        .bind(input.name.trim())
        .bind(&input.category)
        .bind(&input.manufacturer)
        .bind(input.reorder_level)
        .fetch_one(&self.db)
        .await?;

        Ok(to_medicine(row))
    }

    /// Update a catalog entry. Batch line items keep their own snapshot and
    /// are unaffected.
    pub async fn update(&self, id: i64, input: UpdateMedicineInput) -> AppResult<Medicine> {
        let existing = self.get(id).await?;

        let name = input.name.unwrap_or(existing.name);
        let category = input.category.unwrap_or(existing.category);
        let manufacturer = input.manufacturer.unwrap_or(existing.manufacturer);
        let reorder_level = input.reorder_level.unwrap_or(existing.reorder_level);

        if name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Medicine name cannot be empty".to_string(),
            });
        }
        if reorder_level < 0 {
            return Err(AppError::Validation {
                field: "reorder_level".to_string(),
                message: "Reorder level cannot be negative".to_string(),
            });
        }

        let row = sqlx::query_as::<_, MedicineTuple>(
            r#"
            UPDATE medicines
            SET name = $1, category = $2, manufacturer = $3, reorder_level = $4,
                updated_at = NOW()
            WHERE id = $5
            RETURNING id, name, category, manufacturer, reorder_level, active,
                      created_at, updated_at
            "#,
        )
        .bind(name.trim())
        .bind(&category)
        .bind(&manufacturer)
        .bind(reorder_level)
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        Ok(to_medicine(row))
    }

    /// Deactivate a medicine so it no longer accepts new stock. Existing
    /// batches and history are untouched.
    pub async fn deactivate(&self, id: i64) -> AppResult<Medicine> {
        let row = sqlx::query_as::<_, MedicineTuple>(
            r#"
            UPDATE medicines
            SET active = FALSE, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, category, manufacturer, reorder_level, active,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Medicine {}", id)))?;

        Ok(to_medicine(row))
    }

    /// Get a medicine by id.
    pub async fn get(&self, id: i64) -> AppResult<Medicine> {
        let row = sqlx::query_as::<_, MedicineTuple>(
            r#"
            SELECT id, name, category, manufacturer, reorder_level, active,
                   created_at, updated_at
            FROM medicines
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Medicine {}", id)))?;

        Ok(to_medicine(row))
    }

    /// List medicines, active ones by default.
    pub async fn list(
        &self,
        include_inactive: bool,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<Medicine>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM medicines WHERE ($1::bool OR active = TRUE)",
        )
        .bind(include_inactive)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, MedicineTuple>(
            r#"
            SELECT id, name, category, manufacturer, reorder_level, active,
                   created_at, updated_at
            FROM medicines
            WHERE ($1::bool OR active = TRUE)
            ORDER BY name ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(include_inactive)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: rows.into_iter().map(to_medicine).collect(),
            pagination: PaginationMeta::new(&pagination, total as u64),
        })
    }
}
