//! Stock aggregation arithmetic
//!
//! All report computations run over a single snapshot of the finalized batch
//! set: the backend fetches the snapshot in one query and the functions here
//! derive every signal from it, so the numbers in one report are always
//! mutually consistent.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::medicine::{is_low_stock, Medicine};

/// Days ahead of today that count as "expiring soon".
pub const NEAR_EXPIRY_WINDOW_DAYS: i64 = 10;

/// Expiry class of a line item relative to a reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
    Expired,
    ExpiringSoon,
    Ok,
}

/// Classify an expiry date against `today`.
pub fn classify_expiry(expiry: NaiveDate, today: NaiveDate) -> ExpiryStatus {
    if expiry < today {
        ExpiryStatus::Expired
    } else if expiry < today + Duration::days(NEAR_EXPIRY_WINDOW_DAYS) {
        ExpiryStatus::ExpiringSoon
    } else {
        ExpiryStatus::Ok
    }
}

/// One finalized line item in the aggregation snapshot.
#[derive(Debug, Clone)]
pub struct StockSnapshotRow {
    pub medicine_id: i64,
    pub medicine_name: String,
    pub batch_number: String,
    pub quantity: i64,
    pub price: Decimal,
    pub expiry_date: Option<NaiveDate>,
}

/// Summed finalized stock for one medicine, against its current threshold.
#[derive(Debug, Clone, Serialize)]
pub struct MedicineStockLevel {
    pub medicine_id: i64,
    pub name: String,
    pub reorder_level: i64,
    pub in_stock: i64,
}

/// Medicines whose summed finalized stock is strictly below their reorder
/// threshold. Medicines with zero batches are low by definition unless their
/// threshold is also zero.
pub fn low_stock_levels(
    medicines: &[Medicine],
    rows: &[StockSnapshotRow],
) -> Vec<MedicineStockLevel> {
    let totals = stock_totals(rows);
    medicines
        .iter()
        .filter(|m| m.active)
        .filter_map(|m| {
            let in_stock = totals.get(&m.id).copied().unwrap_or(0);
            is_low_stock(in_stock, m.reorder_level).then(|| MedicineStockLevel {
                medicine_id: m.id,
                name: m.name.clone(),
                reorder_level: m.reorder_level,
                in_stock,
            })
        })
        .collect()
}

fn stock_totals(rows: &[StockSnapshotRow]) -> BTreeMap<i64, i64> {
    let mut totals = BTreeMap::new();
    for row in rows {
        *totals.entry(row.medicine_id).or_insert(0) += row.quantity;
    }
    totals
}

/// Contributing batch detail for expiry drill-down.
#[derive(Debug, Clone, Serialize)]
pub struct ExpiryBatchDetail {
    pub batch_number: String,
    pub quantity: i64,
    pub expiry_date: NaiveDate,
}

/// Per-medicine grouping within one expiry class.
#[derive(Debug, Clone, Serialize)]
pub struct MedicineExpiryGroup {
    pub medicine_id: i64,
    pub medicine_name: String,
    pub total_quantity: i64,
    pub batches: Vec<ExpiryBatchDetail>,
}

/// Line items partitioned by expiry class, grouped by medicine.
#[derive(Debug, Clone, Serialize)]
pub struct ExpiryReport {
    pub expired: Vec<MedicineExpiryGroup>,
    pub expiring_soon: Vec<MedicineExpiryGroup>,
}

/// Partition the snapshot into expired / expiring-soon groups.
///
/// Only line items with remaining quantity participate; fully discarded
/// items stay in their batch for history but carry no live stock.
pub fn aggregate_expiry(rows: &[StockSnapshotRow], today: NaiveDate) -> ExpiryReport {
    let mut expired: BTreeMap<i64, MedicineExpiryGroup> = BTreeMap::new();
    let mut expiring_soon: BTreeMap<i64, MedicineExpiryGroup> = BTreeMap::new();

    for row in rows {
        if row.quantity <= 0 {
            continue;
        }
        let Some(expiry) = row.expiry_date else {
            continue;
        };
        let target = match classify_expiry(expiry, today) {
            ExpiryStatus::Expired => &mut expired,
            ExpiryStatus::ExpiringSoon => &mut expiring_soon,
            ExpiryStatus::Ok => continue,
        };
        let group = target
            .entry(row.medicine_id)
            .or_insert_with(|| MedicineExpiryGroup {
                medicine_id: row.medicine_id,
                medicine_name: row.medicine_name.clone(),
                total_quantity: 0,
                batches: Vec::new(),
            });
        group.total_quantity += row.quantity;
        group.batches.push(ExpiryBatchDetail {
            batch_number: row.batch_number.clone(),
            quantity: row.quantity,
            expiry_date: expiry,
        });
    }

    ExpiryReport {
        expired: finish_groups(expired),
        expiring_soon: finish_groups(expiring_soon),
    }
}

fn finish_groups(groups: BTreeMap<i64, MedicineExpiryGroup>) -> Vec<MedicineExpiryGroup> {
    groups
        .into_values()
        .map(|mut g| {
            g.batches
                .sort_by(|a, b| (a.expiry_date, &a.batch_number).cmp(&(b.expiry_date, &b.batch_number)));
            g
        })
        .collect()
}

/// Headline dashboard numbers, all derived from the same snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    /// Medicines below their reorder threshold.
    pub low_stock: i64,
    /// Distinct medicines with stock expiring within the window.
    pub near_expiry: i64,
    /// Distinct medicines with already-expired stock.
    pub already_expired: i64,
    /// Sum of quantity x price over finalized line items.
    #[serde(with = "rust_decimal::serde::str")]
    pub stock_value: Decimal,
}

/// Compute the dashboard stats in one pass over the snapshot.
pub fn dashboard_stats(
    medicines: &[Medicine],
    rows: &[StockSnapshotRow],
    today: NaiveDate,
) -> DashboardStats {
    let mut totals: BTreeMap<i64, i64> = BTreeMap::new();
    let mut near: BTreeSet<i64> = BTreeSet::new();
    let mut expired: BTreeSet<i64> = BTreeSet::new();
    let mut stock_value = Decimal::ZERO;

    for row in rows {
        *totals.entry(row.medicine_id).or_insert(0) += row.quantity;
        stock_value += Decimal::from(row.quantity) * row.price;
        if row.quantity > 0 {
            if let Some(expiry) = row.expiry_date {
                match classify_expiry(expiry, today) {
                    ExpiryStatus::Expired => {
                        expired.insert(row.medicine_id);
                    }
                    ExpiryStatus::ExpiringSoon => {
                        near.insert(row.medicine_id);
                    }
                    ExpiryStatus::Ok => {}
                }
            }
        }
    }

    let low_stock = medicines
        .iter()
        .filter(|m| m.active)
        .filter(|m| is_low_stock(totals.get(&m.id).copied().unwrap_or(0), m.reorder_level))
        .count() as i64;

    DashboardStats {
        low_stock,
        near_expiry: near.len() as i64,
        already_expired: expired.len() as i64,
        stock_value,
    }
}

/// Time bucket width for the intake trend series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendGranularity {
    Week,
    Month,
}

impl TrendGranularity {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "week" => Some(TrendGranularity::Week),
            "month" => Some(TrendGranularity::Month),
            _ => None,
        }
    }
}

/// One finalized batch's contribution to the intake trend.
#[derive(Debug, Clone)]
pub struct BatchIntake {
    pub created_at: DateTime<Utc>,
    pub quantity: i64,
}

/// One point on the intake trend chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    /// Human-readable bucket label ("2025-06" or "2025-W23").
    pub period: String,
    pub bucket_start: NaiveDate,
    pub quantity: i64,
}

/// Bucket finalized batches by creation week or month.
///
/// Buckets are contiguous from the earliest batch to the latest; buckets with
/// no intake report zero so chart consumers see a continuous axis.
pub fn trend_series(intakes: &[BatchIntake], granularity: TrendGranularity) -> Vec<TrendPoint> {
    let mut buckets: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for intake in intakes {
        let start = bucket_start(intake.created_at.date_naive(), granularity);
        *buckets.entry(start).or_insert(0) += intake.quantity;
    }

    let (Some(&first), Some(&last)) = (
        buckets.keys().next(),
        buckets.keys().next_back(),
    ) else {
        return Vec::new();
    };

    let mut series = Vec::new();
    let mut cursor = first;
    while cursor <= last {
        series.push(TrendPoint {
            period: bucket_label(cursor, granularity),
            bucket_start: cursor,
            quantity: buckets.get(&cursor).copied().unwrap_or(0),
        });
        cursor = next_bucket(cursor, granularity);
    }
    series
}

/// First day of the bucket containing `date`.
pub fn bucket_start(date: NaiveDate, granularity: TrendGranularity) -> NaiveDate {
    match granularity {
        TrendGranularity::Week => {
            date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
        }
        TrendGranularity::Month => {
            NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
        }
    }
}

fn next_bucket(start: NaiveDate, granularity: TrendGranularity) -> NaiveDate {
    match granularity {
        TrendGranularity::Week => start + Duration::days(7),
        TrendGranularity::Month => {
            let (year, month) = if start.month() == 12 {
                (start.year() + 1, 1)
            } else {
                (start.year(), start.month() + 1)
            };
            NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(start + Duration::days(31))
        }
    }
}

fn bucket_label(start: NaiveDate, granularity: TrendGranularity) -> String {
    match granularity {
        TrendGranularity::Week => start.format("%G-W%V").to_string(),
        TrendGranularity::Month => start.format("%Y-%m").to_string(),
    }
}
