//! Stock aggregation service
//!
//! Read-only cross-batch computations for dashboards and expiry views. Each
//! report fetches the finalized batch set in a single statement, so every
//! number it returns is derived from one consistent snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{types::Json, PgPool};

use crate::error::{AppError, AppResult};
use crate::models::{
    aggregate_expiry, dashboard_stats as compute_dashboard_stats, low_stock_levels,
    trend_series as compute_trend_series, BatchIntake, DashboardStats, ExpiryReport, LineItem,
    Medicine, MedicineStockLevel, StockSnapshotRow, TrendGranularity, TrendPoint,
};

/// Stock aggregation service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
}

/// Row for the finalized-batch snapshot query
#[derive(sqlx::FromRow)]
struct FinalizedBatchRow {
    batch_number: String,
    created_at: DateTime<Utc>,
    line_items: Json<Vec<LineItem>>,
}

/// Flat row for CSV export of the expiry report
#[derive(Debug, Serialize)]
pub struct ExpiryCsvRow {
    pub status: String,
    pub medicine_id: i64,
    pub medicine_name: String,
    pub batch_number: String,
    pub quantity: i64,
    pub expiry_date: chrono::NaiveDate,
}

impl ReportingService {
    /// Create a new ReportingService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Medicines whose summed finalized stock is below their reorder level.
    pub async fn low_stock_report(&self) -> AppResult<Vec<MedicineStockLevel>> {
        let medicines = self.fetch_active_medicines().await?;
        let rows = self.fetch_stock_snapshot().await?;
        Ok(low_stock_levels(&medicines, &rows))
    }

    /// Line items grouped into expired / expiring-soon classes.
    pub async fn expiry_report(&self) -> AppResult<ExpiryReport> {
        let rows = self.fetch_stock_snapshot().await?;
        Ok(aggregate_expiry(&rows, Utc::now().date_naive()))
    }

    /// Headline dashboard numbers, all from one snapshot.
    pub async fn dashboard_stats(&self) -> AppResult<DashboardStats> {
        let medicines = self.fetch_active_medicines().await?;
        let rows = self.fetch_stock_snapshot().await?;
        Ok(compute_dashboard_stats(
            &medicines,
            &rows,
            Utc::now().date_naive(),
        ))
    }

    /// Intake quantity bucketed by batch creation week or month.
    pub async fn trend_series(&self, granularity: TrendGranularity) -> AppResult<Vec<TrendPoint>> {
        let batches = self.fetch_finalized_batches().await?;
        let intakes: Vec<BatchIntake> = batches
            .iter()
            .map(|b| BatchIntake {
                created_at: b.created_at,
                quantity: b.line_items.0.iter().map(|i| i.quantity).sum(),
            })
            .collect();
        Ok(compute_trend_series(&intakes, granularity))
    }

    /// Flatten the expiry report for CSV export.
    pub fn flatten_expiry_report(report: &ExpiryReport) -> Vec<ExpiryCsvRow> {
        let mut rows = Vec::new();
        for (status, groups) in [
            ("expired", &report.expired),
            ("expiring_soon", &report.expiring_soon),
        ] {
            for group in groups {
                for batch in &group.batches {
                    rows.push(ExpiryCsvRow {
                        status: status.to_string(),
                        medicine_id: group.medicine_id,
                        medicine_name: group.medicine_name.clone(),
                        batch_number: batch.batch_number.clone(),
                        quantity: batch.quantity,
                        expiry_date: batch.expiry_date,
                    });
                }
            }
        }
        rows
    }

    /// Export report data as CSV
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let csv_data = String::from_utf8(
            wtr.into_inner()
                .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?,
        )
        .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))?;
        Ok(csv_data)
    }

    async fn fetch_finalized_batches(&self) -> AppResult<Vec<FinalizedBatchRow>> {
        let rows = sqlx::query_as::<_, FinalizedBatchRow>(
            r#"
            SELECT batch_number, created_at, line_items
            FROM batches
            WHERE is_draft = FALSE
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn fetch_stock_snapshot(&self) -> AppResult<Vec<StockSnapshotRow>> {
        let batches = self.fetch_finalized_batches().await?;
        let mut rows = Vec::new();
        for batch in batches {
            for item in batch.line_items.0 {
                rows.push(StockSnapshotRow {
                    medicine_id: item.medicine_id,
                    medicine_name: item.medicine_name,
                    batch_number: batch.batch_number.clone(),
                    quantity: item.quantity,
                    price: item.price,
                    expiry_date: item.expiry_date,
                });
            }
        }
        Ok(rows)
    }

    async fn fetch_active_medicines(&self) -> AppResult<Vec<Medicine>> {
        let rows = sqlx::query_as::<
            _,
            (
                i64,
                String,
                String,
                String,
                i64,
                bool,
                DateTime<Utc>,
                DateTime<Utc>,
            ),
        >(
            r#"
            SELECT id, name, category, manufacturer, reorder_level, active,
                   created_at, updated_at
            FROM medicines
            WHERE active = TRUE
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| Medicine {
                id: r.0,
                name: r.1,
                category: r.2,
                manufacturer: r.3,
                reorder_level: r.4,
                active: r.5,
                created_at: r.6,
                updated_at: r.7,
            })
            .collect())
    }
}
